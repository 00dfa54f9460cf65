// Error types for the Business Rules System

use thiserror::Error;

use crate::orders::OrderError;

/// Errors raised while evaluating loyalty and coupon rules
///
/// These never reach a client directly: coupon failures make the coupon a
/// no-op and loyalty failures are logged after the order has committed.
#[derive(Debug, Error)]
pub enum BusinessRulesError {
    /// Reading or writing rule inputs failed
    #[error("Store error: {0}")]
    StoreError(#[from] OrderError),

    /// User referenced by a rule evaluation does not exist
    #[error("User not found: {0}")]
    UserNotFound(i32),

    /// Background rule task ended abnormally
    #[error("Rule task failed: {0}")]
    TaskFailed(String),
}

/// Result type alias for Business Rules operations
pub type BRResult<T> = Result<T, BusinessRulesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = BusinessRulesError::UserNotFound(7);
        assert_eq!(error.to_string(), "User not found: 7");

        let error: BusinessRulesError = OrderError::DatabaseError("boom".to_string()).into();
        assert_eq!(error.to_string(), "Store error: Database error: boom");
    }
}
