//! Error types for module-service calls.

use thiserror::Error;

/// Errors surfaced by [`crate::ModuleClient`] and the discovery layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The circuit for this module is open; no request was attempted.
    #[error("circuit open for module '{module}'")]
    CircuitOpen { module: String },

    /// Every attempt in the retry budget failed.
    #[error("module '{module}' unavailable after {attempts} attempts")]
    Unavailable { module: String, attempts: u32 },

    /// The server answered with a non-retryable application status.
    #[error("module request failed with status {status}: {code}: {message}")]
    Application {
        status: u16,
        code: String,
        message: String,
    },

    /// Service discovery could not produce an endpoint.
    #[error("service discovery failed: {0}")]
    Discovery(String),

    /// Transport-level HTTP failure.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected.
    #[error("invalid response payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ClientError::CircuitOpen {
            module: "browser".into(),
        };
        assert_eq!(err.to_string(), "circuit open for module 'browser'");

        let err = ClientError::Unavailable {
            module: "speech".into(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "module 'speech' unavailable after 3 attempts"
        );

        let err = ClientError::Application {
            status: 404,
            code: "not_found".into(),
            message: "no such session".into(),
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("not_found"));
    }
}
