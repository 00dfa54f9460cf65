use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::response::failure_response;

/// Error types for order operations
///
/// Everything before the transaction short-circuits with a specific,
/// user-safe message. Persistence failures are logged in full and reach the
/// client only as a generic message.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("User not found")]
    UserNotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Order not found")]
    NotFound,

    #[error("No available products to reorder")]
    NoAvailableProducts,

    #[error("Order transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        OrderError::DatabaseError(err.to_string())
    }
}

impl OrderError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::Unauthorized => StatusCode::UNAUTHORIZED,
            OrderError::ValidationError(_) => StatusCode::BAD_REQUEST,
            OrderError::EmptyCart => StatusCode::BAD_REQUEST,
            OrderError::UserNotFound => StatusCode::NOT_FOUND,
            OrderError::Forbidden(_) => StatusCode::FORBIDDEN,
            OrderError::NotFound => StatusCode::NOT_FOUND,
            OrderError::NoAvailableProducts => StatusCode::BAD_REQUEST,
            OrderError::TransactionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OrderError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to show to the caller
    pub fn client_message(&self) -> String {
        match self {
            OrderError::ValidationError(msg) => msg.clone(),
            OrderError::Forbidden(msg) => msg.clone(),
            OrderError::TransactionFailed(_) => "Failed to create order".to_string(),
            OrderError::DatabaseError(_) => "A database error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        match &self {
            OrderError::TransactionFailed(detail) => {
                tracing::error!("Order transaction failed: {}", detail);
            }
            OrderError::DatabaseError(detail) => {
                tracing::error!("Database error: {}", detail);
            }
            OrderError::Forbidden(msg) => {
                tracing::warn!("Forbidden order access: {}", msg);
            }
            other => {
                tracing::debug!("Order request rejected: {}", other);
            }
        }

        failure_response(self.status_code(), self.client_message())
    }
}
