// Coupon rules
//
// A small strategy table keyed by normalized code. Each entry pairs a pure
// eligibility predicate over the customer's order history with a pure
// discount function over the order subtotal, so adding a coupon never
// touches the pricing code.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::business_rules::error::BRResult;
use crate::orders::{round2, OrderStatus, OrderStore};

/// Code of the win-back coupon offered to churned customers
pub const REENGAGEMENT_COUPON: &str = "COFFEE10";

/// Statuses that count as a completed purchase
pub const COMPLETED_STATUSES: [OrderStatus; 1] = [OrderStatus::Delivered];

/// Statuses that count as an abandoned purchase
pub const CANCELLED_STATUSES: [OrderStatus; 1] = [OrderStatus::Cancelled];

/// Order counts a coupon predicate is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderHistorySnapshot {
    pub completed_orders: i64,
    pub cancelled_orders: i64,
}

impl OrderHistorySnapshot {
    /// Read the user's current counts; never cached
    pub async fn load(store: &dyn OrderStore, user_id: i32) -> BRResult<Self> {
        let completed_orders = store.count_orders_by_status(user_id, &COMPLETED_STATUSES).await?;
        let cancelled_orders = store.count_orders_by_status(user_id, &CANCELLED_STATUSES).await?;

        Ok(Self {
            completed_orders,
            cancelled_orders,
        })
    }
}

/// Win-back signal: at least one cancelled order and nothing ever delivered
pub fn is_reengagement_eligible(history: &OrderHistorySnapshot) -> bool {
    history.completed_orders == 0 && history.cancelled_orders >= 1
}

/// Trim and uppercase a user-entered code
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// One recognized coupon
#[derive(Clone, Copy)]
pub struct CouponRule {
    pub code: &'static str,
    pub is_eligible: fn(&OrderHistorySnapshot) -> bool,
    pub discount: fn(Decimal) -> Decimal,
}

impl std::fmt::Debug for CouponRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouponRule").field("code", &self.code).finish()
    }
}

fn ten_percent_off(subtotal: Decimal) -> Decimal {
    round2(subtotal * Decimal::new(10, 2))
}

/// Recognized coupons keyed by normalized code
#[derive(Debug, Clone)]
pub struct CouponTable {
    rules: HashMap<&'static str, CouponRule>,
}

impl CouponTable {
    pub fn new(rules: impl IntoIterator<Item = CouponRule>) -> Self {
        Self {
            rules: rules.into_iter().map(|rule| (rule.code, rule)).collect(),
        }
    }

    /// Look up a code as the customer typed it
    pub fn lookup(&self, code: &str) -> Option<&CouponRule> {
        self.rules.get(normalize_code(code).as_str())
    }

    /// Decide whether `code` applies to `user_id` right now
    ///
    /// Unknown codes and ineligible customers both yield `None`; callers
    /// carry on without a coupon. History is only read for known codes.
    pub async fn resolve(
        &self,
        store: &dyn OrderStore,
        user_id: i32,
        code: &str,
    ) -> BRResult<Option<CouponRule>> {
        let Some(rule) = self.lookup(code) else {
            tracing::debug!("Ignoring unrecognized coupon code {:?}", code);
            return Ok(None);
        };

        let history = OrderHistorySnapshot::load(store, user_id).await?;
        if (rule.is_eligible)(&history) {
            Ok(Some(*rule))
        } else {
            tracing::debug!("User {} is not eligible for coupon {}", user_id, rule.code);
            Ok(None)
        }
    }
}

impl Default for CouponTable {
    fn default() -> Self {
        Self::new([CouponRule {
            code: REENGAGEMENT_COUPON,
            is_eligible: is_reengagement_eligible,
            discount: ten_percent_off,
        }])
    }
}
