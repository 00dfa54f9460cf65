// Response envelope shared by every endpoint
// Success and failure paths serialize to the same shape so clients never
// have to tell a thrown failure from a returned one.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// `{success, data?, error?, timestamp}` wrapper
///
/// `timestamp` is Unix time in milliseconds.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
}

impl<T> ApiResponse<T> {
    /// Wrap a successful payload
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

impl ApiResponse<()> {
    /// Build a failure envelope carrying a client-safe message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Render a failure envelope with the given status code
pub fn failure_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::failure(message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_omits_error() {
        let envelope = ApiResponse::ok(serde_json::json!({ "orderId": "abc" }));
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["orderId"], "abc");
        assert!(json.get("error").is_none());
        assert!(json["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_failure_envelope_omits_data() {
        let envelope = ApiResponse::failure("Cart is empty");
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Cart is empty");
        assert!(json.get("data").is_none());
    }
}
