// Loyalty Engine
//
// Static tier benefits used by pricing, and the post-commit trigger that
// re-evaluates a customer's tier from their live order history.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::business_rules::{
    error::{BRResult, BusinessRulesError},
    types::LoyaltyTier,
};
use crate::orders::{OrderStatus, OrderStore};

/// Benefits granted by a loyalty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierBenefits {
    /// Fraction of the subtotal given back as VIP discount (0.05 = 5%)
    pub discount_rate: Decimal,
    pub free_shipping: bool,
    /// Charged when `free_shipping` is false
    pub shipping_fee: Decimal,
}

impl TierBenefits {
    pub fn for_tier(tier: LoyaltyTier) -> Self {
        match tier {
            LoyaltyTier::Silver => Self {
                discount_rate: Decimal::ZERO,
                free_shipping: false,
                shipping_fee: Decimal::new(1500, 2),
            },
            LoyaltyTier::Gold => Self {
                discount_rate: Decimal::new(5, 2),
                free_shipping: false,
                shipping_fee: Decimal::new(1000, 2),
            },
            LoyaltyTier::Platinum => Self {
                discount_rate: Decimal::new(10, 2),
                free_shipping: true,
                shipping_fee: Decimal::ZERO,
            },
        }
    }

    /// Shipping actually charged for an order at this tier
    pub fn effective_shipping_fee(&self) -> Decimal {
        if self.free_shipping {
            Decimal::ZERO
        } else {
            self.shipping_fee
        }
    }
}

/// Minimum qualifying spend per tier, highest first
fn tier_thresholds() -> [(LoyaltyTier, Decimal); 2] {
    [
        (LoyaltyTier::Platinum, Decimal::from(1500)),
        (LoyaltyTier::Gold, Decimal::from(500)),
    ]
}

/// Statuses whose spend does not count towards a tier
pub const NON_QUALIFYING_STATUSES: [OrderStatus; 2] = [OrderStatus::Cancelled, OrderStatus::Refunded];

/// Tier earned by a given qualifying spend
pub fn tier_for_spend(qualifying_spend: Decimal) -> LoyaltyTier {
    tier_thresholds()
        .into_iter()
        .find(|(_, threshold)| qualifying_spend >= *threshold)
        .map(|(tier, _)| tier)
        .unwrap_or(LoyaltyTier::Silver)
}

/// Loyalty Engine
///
/// Runs outside the order transaction. A failure here must never fail or
/// roll back the order that triggered it.
pub struct LoyaltyEngine {
    store: Arc<dyn OrderStore>,
}

impl LoyaltyEngine {
    /// Create a new LoyaltyEngine
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Recompute the user's tier and persist it if it went up
    ///
    /// Returns the new tier when an upgrade just happened, `None` otherwise.
    /// Tiers are never lowered here.
    pub async fn refresh_tier(&self, user_id: i32) -> BRResult<Option<LoyaltyTier>> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(BusinessRulesError::UserNotFound(user_id))?;
        let current = LoyaltyTier::from_stored(user.tier.as_deref());

        let summary = self
            .store
            .loyalty_summary(user_id, &NON_QUALIFYING_STATUSES)
            .await?;
        let earned = tier_for_spend(summary.qualifying_spend);

        if earned <= current {
            tracing::debug!(
                "User {} stays at {} (qualifying spend {} over {} orders)",
                user_id,
                current,
                summary.qualifying_spend,
                summary.qualifying_orders
            );
            return Ok(None);
        }

        self.store.update_user_tier(user_id, earned).await?;
        tracing::info!("User {} upgraded from {} to {}", user_id, current, earned);

        Ok(Some(earned))
    }
}
