// Validation utilities module
// Custom validators for order request fields

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;
use validator::ValidationError;

fn coupon_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[A-Za-z0-9_-]{1,32}\s*$").expect("coupon regex is valid"))
}

/// Validates that a coupon code is a short alphanumeric token
/// Surrounding whitespace is tolerated, normalization trims it later.
pub fn validate_coupon_code(code: &str) -> Result<(), ValidationError> {
    if coupon_code_regex().is_match(code) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_coupon_code"))
    }
}

/// Largest amount a `NUMERIC(12,2)` money column can hold
pub fn max_money_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Validates a monetary amount: not negative, whole cents, storable
pub fn validate_money_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ValidationError::new("amount_must_not_be_negative"));
    }
    if amount.normalize().scale() > 2 {
        return Err(ValidationError::new("amount_must_be_whole_cents"));
    }
    if *amount > max_money_amount() {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

/// Validates that an identifier is not blank
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}
