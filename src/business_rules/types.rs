// Domain type definitions for the Business Rules System

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Loyalty tier assigned to a customer
///
/// Variants are declared lowest first so `Ord` reflects rank.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
    ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoyaltyTier {
    #[default]
    Silver,
    Gold,
    Platinum,
}

impl LoyaltyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoyaltyTier::Silver => "SILVER",
            LoyaltyTier::Gold => "GOLD",
            LoyaltyTier::Platinum => "PLATINUM",
        }
    }

    /// Interpret the tier column of a user row
    ///
    /// Unset or unrecognized values fall back to the lowest tier; an order
    /// is never rejected over a bad tier value.
    pub fn from_stored(value: Option<&str>) -> Self {
        value
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoyaltyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SILVER" => Ok(LoyaltyTier::Silver),
            "GOLD" => Ok(LoyaltyTier::Gold),
            "PLATINUM" => Ok(LoyaltyTier::Platinum),
            _ => Err(format!("Invalid loyalty tier: {}", s)),
        }
    }
}
