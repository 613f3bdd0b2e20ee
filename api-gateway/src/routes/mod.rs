//! HTTP routes and the JSON response envelope.
//!
//! Every endpoint answers with the same envelope shape:
//!
//! ```json
//! { "result": ..., "error": { "code": 404, "message": "..." }, "id": "..." }
//! ```
//!
//! with `result` and `error` mutually exclusive and `id` echoing the
//! caller-supplied request id when there is one.

pub mod blocks;
pub mod health;

use serde::Serialize;

/// Error half of the response envelope.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
}

/// JSON response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope {
    pub result: Option<serde_json::Value>,
    pub error: Option<ApiError>,
    pub id: Option<String>,
}

impl ApiEnvelope {
    /// Successful response carrying `result`.
    pub fn ok(result: serde_json::Value, id: Option<String>) -> Self {
        Self {
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Failed response carrying an error code and message.
    pub fn fail(code: i32, message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            result: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_serializes_with_null_error() {
        let envelope = ApiEnvelope::ok(serde_json::json!({"status": "ok"}), None);
        let value = serde_json::to_value(&envelope).expect("envelope serializes");
        assert_eq!(value["result"]["status"], "ok");
        assert!(value["error"].is_null());
        assert!(value["id"].is_null());
    }

    #[test]
    fn fail_envelope_carries_code_message_and_id() {
        let envelope = ApiEnvelope::fail(404, "block 9 not found", Some("req-1".to_string()));
        let value = serde_json::to_value(&envelope).expect("envelope serializes");
        assert!(value["result"].is_null());
        assert_eq!(value["error"]["code"], 404);
        assert_eq!(value["error"]["message"], "block 9 not found");
        assert_eq!(value["id"], "req-1");
    }
}
