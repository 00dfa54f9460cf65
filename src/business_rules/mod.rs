// Business Rules System Module
//
// Rules that shape an order's price and its loyalty side effects:
// - Loyalty: static tier benefits and the post-commit tier refresh
// - Coupons: recognized codes, their eligibility predicates and discounts

pub mod error;
pub mod types;
pub mod loyalty;
pub mod coupons;

// Re-export commonly used types for convenience
pub use error::{BusinessRulesError, BRResult};
pub use types::LoyaltyTier;
pub use loyalty::{tier_for_spend, LoyaltyEngine, TierBenefits, NON_QUALIFYING_STATUSES};
pub use coupons::{
    is_reengagement_eligible,
    normalize_code,
    CouponRule,
    CouponTable,
    OrderHistorySnapshot,
    REENGAGEMENT_COUPON,
};
