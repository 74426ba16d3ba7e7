//! # API Response Envelope
//!
//! Every endpoint returns an [`ApiResponse<T>`]:
//!
//! ```json
//! { "success": true,  "data": { ... } }
//! { "success": false, "message": "No valid files to process" }
//! ```
//!
//! The HTTP status travels out-of-band and is never serialized.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::BridgeError;

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    /// Present on success, absent on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Present on error. Safe to show to end users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            status: StatusCode::OK,
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            status,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                let body = serde_json::json!({
                    "success": false,
                    "message": INTERNAL_ERROR_MESSAGE,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl<T: Serialize> From<BridgeError> for ApiResponse<T> {
    /// Engine diagnostics are passed through as the message since they are
    /// the only useful explanation a caller gets. Internal failures are
    /// logged and replaced with a generic message.
    fn from(err: BridgeError) -> Self {
        let status = err.status_code();
        match err {
            BridgeError::Validation(msg) => ApiResponse::error(status, msg),

            BridgeError::Json(e) => ApiResponse::error(status, format!("Invalid JSON: {e}")),

            BridgeError::Process(e) => ApiResponse::error(status, e.message),

            BridgeError::Decode(e) => ApiResponse::error(status, e.message),

            ref internal @ (BridgeError::Io(_) | BridgeError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to response");
                ApiResponse::error(status, INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, ProcessError, ProcessErrorKind};

    #[test]
    fn success_response_serializes_without_message() {
        let resp = ApiResponse::success("hello");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], "hello");
        assert!(json.get("message").is_none());
        assert!(json.get("status").is_none());
    }

    #[test]
    fn error_response_serializes_without_data() {
        let resp = ApiResponse::<()>::bad_request("No files uploaded");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["message"], "No files uploaded");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn engine_message_is_passed_through() {
        let err: BridgeError =
            ProcessError::new(ProcessErrorKind::NonZeroExit, "Unsupported file type: .xyz").into();
        let resp: ApiResponse<()> = err.into();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.message.as_deref(), Some("Unsupported file type: .xyz"));
    }

    #[test]
    fn spawn_failure_maps_to_service_unavailable() {
        let err: BridgeError =
            ProcessError::new(ProcessErrorKind::SpawnFailure, "'python' was not found").into();
        let resp: ApiResponse<()> = err.into();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn batch_parse_failure_keeps_its_message() {
        let resp: ApiResponse<()> = BridgeError::from(DecodeError::batch_parse_failure("eof")).into();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp
            .message
            .as_deref()
            .unwrap_or_default()
            .starts_with("Failed to parse batch results"));
    }

    #[test]
    fn internal_error_does_not_leak() {
        let resp: ApiResponse<()> = BridgeError::Internal("secret debug info".into()).into();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.message.as_deref(), Some(INTERNAL_ERROR_MESSAGE));
    }
}
