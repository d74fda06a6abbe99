//! Completion backend error types

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while requesting a completion
#[derive(Error, Debug)]
pub enum BackendError {
    /// Missing API key
    #[error("API key is required for {backend} (set {var})")]
    MissingApiKey { backend: String, var: String },

    /// Non-200 response
    #[error("{backend} API error ({status}): {message}")]
    ApiError {
        backend: String,
        status: u16,
        message: String,
    },

    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// No response within the bounded wait
    #[error("{backend} did not respond within {timeout:?}")]
    Timeout { backend: String, timeout: Duration },

    /// Request never produced a response (connect, resolve, build)
    #[error("Request to {backend} failed: {message}")]
    RequestFailed { backend: String, message: String },

    /// Response stream broke off or could not be decoded
    #[error("{backend} response stream failed: {message}")]
    StreamFailed { backend: String, message: String },

    /// Response body did not have the expected shape
    #[error("Invalid response from {backend}: {message}")]
    InvalidResponse { backend: String, message: String },
}

impl BackendError {
    /// Create an API error
    pub fn api_error(backend: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            backend: backend.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a missing API key error
    pub fn missing_api_key(backend: impl Into<String>, var: impl Into<String>) -> Self {
        Self::MissingApiKey {
            backend: backend.into(),
            var: var.into(),
        }
    }

    pub fn request_failed(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn stream_failed(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamFailed {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BackendError::api_error("chutes", 401, "unauthorized");
        assert_eq!(err.to_string(), "chutes API error (401): unauthorized");

        let err = BackendError::missing_api_key("chutes", "CHUTES_API_TOKEN");
        assert!(err.to_string().contains("CHUTES_API_TOKEN"));

        let err = BackendError::Timeout {
            backend: "chutes".into(),
            timeout: Duration::from_secs(60),
        };
        assert!(err.to_string().contains("60s"));
    }

    #[test]
    fn test_failures_without_a_response_carry_no_status() {
        let err = BackendError::request_failed("openrouter", "dns error");
        assert_eq!(err.to_string(), "Request to openrouter failed: dns error");
        assert!(!matches!(err, BackendError::ApiError { .. }));

        let err = BackendError::stream_failed("openrouter", "unexpected eof");
        assert_eq!(
            err.to_string(),
            "openrouter response stream failed: unexpected eof"
        );
        assert!(!err.to_string().contains("500"));
    }
}
