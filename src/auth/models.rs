// Identity data models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The signed-in caller as provided by the identity layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub email: String,
    pub name: String,
}

/// The slice of a persisted user that ordering reads and updates
///
/// `tier` is stored as free text and may be unset or stale; callers go
/// through `LoyaltyTier::from_stored` rather than trusting it.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub tier: Option<String>,
    pub points: i64,
    pub total_spent: Decimal,
    pub order_count: i32,
}
