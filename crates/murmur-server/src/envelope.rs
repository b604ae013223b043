//! Standardized error envelope shared by all module servers.
//!
//! Every error response carries `{"error": {"code", "message"}}` so the
//! host-side client can decode failures uniformly regardless of which
//! module produced them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Wire shape of an error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable machine-readable identifier, e.g. `session_not_found`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

/// Build an enveloped error response.
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(ErrorBody::new(code, message))).into_response()
}

/// The canonical "backing service not initialized" response.
pub fn service_unavailable() -> Response {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "service_unavailable",
        "service is not initialized",
    )
}

/// Guard for handlers whose backing service is optional at startup.
///
/// Handlers call this first and `?`-return the 503 envelope when the
/// service never came up, keeping the unavailable path out of handler
/// logic.
pub fn require_service<T>(service: Option<&T>) -> std::result::Result<&T, Response> {
    service.ok_or_else(service_unavailable)
}
