use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use uuid::Uuid;

use crate::business_rules::{CouponRule, TierBenefits};
use crate::models::Product;
use crate::orders::error::OrderError;
use crate::orders::models::NewOrderItem;
use crate::orders::reifier::ReifiedLine;
use crate::validation::max_money_amount;

/// Round a monetary amount to cents, halves away from zero
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Largest accepted gap between the client's total and the server subtotal
fn total_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

fn amount_out_of_range() -> OrderError {
    OrderError::ValidationError("Order amount is out of range".to_string())
}

/// Outcome of pricing an order
#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub subtotal: Decimal,
    pub vip_discount: Decimal,
    pub coupon_discount: Decimal,
    pub applied_coupon: Option<String>,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub points_earned: i64,
}

/// Service for calculating order prices and subtotals
pub struct PriceCalculator;

impl PriceCalculator {
    /// Calculate subtotal for an order line
    pub fn calculate_subtotal(quantity: i32, unit_price: Decimal) -> Result<Decimal, OrderError> {
        Decimal::from(quantity)
            .checked_mul(unit_price)
            .ok_or_else(amount_out_of_range)
    }

    /// Sum of all line subtotals
    pub fn calculate_total(subtotals: &[Decimal]) -> Result<Decimal, OrderError> {
        subtotals.iter().try_fold(Decimal::ZERO, |acc, subtotal| {
            acc.checked_add(*subtotal).ok_or_else(amount_out_of_range)
        })
    }

    /// Attach the unit price each reified line is charged at
    ///
    /// Catalog lines are charged the current catalog price; custom lines
    /// keep the submitted price since they have no catalog price of their own.
    pub fn price_lines(
        lines: &[ReifiedLine],
        catalog: &HashMap<Uuid, Product>,
    ) -> Result<Vec<NewOrderItem>, OrderError> {
        lines
            .iter()
            .map(|line| {
                let unit_price = if line.custom {
                    line.submitted_price
                } else {
                    catalog
                        .get(&line.product_id)
                        .map(|product| product.price)
                        .ok_or_else(|| {
                            OrderError::ValidationError(format!(
                                "Product {} is not available",
                                line.product_id
                            ))
                        })?
                };

                Ok(NewOrderItem {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    size: line.size,
                    unit_price,
                })
            })
            .collect()
    }

    /// Server-side subtotal of priced lines
    ///
    /// Fails when the subtotal does not fit a stored money amount.
    pub fn items_subtotal(items: &[NewOrderItem]) -> Result<Decimal, OrderError> {
        let subtotals = items
            .iter()
            .map(|item| Self::calculate_subtotal(item.quantity, item.unit_price))
            .collect::<Result<Vec<_>, _>>()?;
        let subtotal = Self::calculate_total(&subtotals)?;
        if subtotal > max_money_amount() {
            return Err(amount_out_of_range());
        }
        Ok(subtotal)
    }

    /// Reject a submitted total that drifted from current prices
    pub fn check_submitted_total(submitted: Decimal, subtotal: Decimal) -> Result<(), OrderError> {
        if (submitted - subtotal).abs() > total_tolerance() {
            tracing::debug!(
                "Submitted total {} does not match computed subtotal {}",
                submitted,
                subtotal
            );
            return Err(OrderError::ValidationError(
                "Cart total does not match current prices".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply tier benefits and an accepted coupon to a subtotal
    ///
    /// The discounted amount is rounded and clamped at zero before shipping
    /// is added; shipping is never discounted.
    pub fn price_order(
        subtotal: Decimal,
        benefits: &TierBenefits,
        coupon: Option<&CouponRule>,
    ) -> PricedOrder {
        let vip_discount = round2(subtotal * benefits.discount_rate);
        let shipping_fee = benefits.effective_shipping_fee();
        let coupon_discount = coupon
            .map(|rule| (rule.discount)(subtotal))
            .unwrap_or(Decimal::ZERO);

        let net = round2(subtotal - coupon_discount - vip_discount).max(Decimal::ZERO);
        let total = net + shipping_fee;

        PricedOrder {
            subtotal,
            vip_discount,
            coupon_discount,
            applied_coupon: coupon.map(|rule| rule.code.to_string()),
            shipping_fee,
            total,
            points_earned: Self::points_for(total),
        }
    }

    /// Loyalty points for a final total: ten per currency unit, rounded
    pub fn points_for(total: Decimal) -> i64 {
        (total * Decimal::from(10))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(i64::MAX)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::business_rules::{CouponTable, LoyaltyTier};
    use proptest::prelude::*;

    fn any_tier() -> impl Strategy<Value = LoyaltyTier> {
        prop_oneof![
            Just(LoyaltyTier::Silver),
            Just(LoyaltyTier::Gold),
            Just(LoyaltyTier::Platinum),
        ]
    }

    /// No priced amount is ever negative
    #[test]
    fn prop_priced_amounts_are_non_negative() {
        proptest!(|(
            subtotal_cents in 0u32..=10_000_000u32,
            tier in any_tier(),
            with_coupon in any::<bool>()
        )| {
            let subtotal = Decimal::new(subtotal_cents as i64, 2);
            let rule = CouponTable::default().lookup("COFFEE10").copied();
            let coupon = if with_coupon { rule.as_ref() } else { None };

            let priced = PriceCalculator::price_order(subtotal, &TierBenefits::for_tier(tier), coupon);

            prop_assert!(priced.total >= Decimal::ZERO);
            prop_assert!(priced.vip_discount >= Decimal::ZERO);
            prop_assert!(priced.coupon_discount >= Decimal::ZERO);
            prop_assert!(priced.points_earned >= 0);
        });
    }

    /// VIP discount is the tier rate applied to the subtotal, rounded to cents
    #[test]
    fn prop_vip_discount_matches_tier_rate() {
        proptest!(|(subtotal_cents in 0u32..=10_000_000u32, tier in any_tier())| {
            let subtotal = Decimal::new(subtotal_cents as i64, 2);
            let benefits = TierBenefits::for_tier(tier);

            let priced = PriceCalculator::price_order(subtotal, &benefits, None);

            prop_assert_eq!(priced.vip_discount, round2(subtotal * benefits.discount_rate));
        });
    }

    /// Shipping is free exactly for tiers with free shipping, flat otherwise
    #[test]
    fn prop_shipping_follows_tier_table() {
        proptest!(|(subtotal_cents in 0u32..=10_000_000u32, tier in any_tier())| {
            let subtotal = Decimal::new(subtotal_cents as i64, 2);
            let benefits = TierBenefits::for_tier(tier);

            let priced = PriceCalculator::price_order(subtotal, &benefits, None);

            if benefits.free_shipping {
                prop_assert_eq!(priced.shipping_fee, Decimal::ZERO);
            } else {
                prop_assert_eq!(priced.shipping_fee, benefits.shipping_fee);
            }
            prop_assert!(priced.total >= priced.shipping_fee);
        });
    }

    /// Points are always ten times the final total, rounded
    #[test]
    fn prop_points_track_total() {
        proptest!(|(subtotal_cents in 0u32..=10_000_000u32, tier in any_tier())| {
            let subtotal = Decimal::new(subtotal_cents as i64, 2);

            let priced = PriceCalculator::price_order(subtotal, &TierBenefits::for_tier(tier), None);

            let exact = priced.total * Decimal::from(10);
            prop_assert!((Decimal::from(priced.points_earned) - exact).abs() <= Decimal::new(5, 1));
        });
    }

    /// Any submitted total within a cent of the subtotal passes the check
    #[test]
    fn prop_integrity_check_accepts_within_one_cent() {
        proptest!(|(subtotal_cents in 1i64..=10_000_000i64, drift in -1i64..=1i64)| {
            let subtotal = Decimal::new(subtotal_cents, 2);
            let submitted = Decimal::new(subtotal_cents + drift, 2);

            prop_assert!(PriceCalculator::check_submitted_total(submitted, subtotal).is_ok());
        });
    }
}
