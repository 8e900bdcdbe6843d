//! Model invocation errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after_seconds} seconds")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

impl ModelError {
    /// Whether a caller may retry the invocation that produced this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::RateLimited { .. } | ModelError::Network(_) | ModelError::Timeout(_) => {
                true
            }
            ModelError::ApiError { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ModelError::ApiError {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 503 - unavailable");
        assert!(ModelError::Timeout(5).to_string().contains("5 seconds"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(ModelError::RateLimited {
            retry_after_seconds: 1
        }
        .is_retryable());
        assert!(ModelError::Network("reset".to_string()).is_retryable());
        assert!(ModelError::Timeout(30).is_retryable());
        assert!(!ModelError::InvalidRequest("bad".to_string()).is_retryable());
        assert!(!ModelError::ModelNotFound("m".to_string()).is_retryable());
        assert!(!ModelError::StreamError("closed".to_string()).is_retryable());
    }

    #[test]
    fn test_is_retryable_status() {
        for status in [429, 500, 502, 503, 504] {
            let err = ModelError::ApiError {
                status,
                message: String::new(),
            };
            assert!(err.is_retryable(), "status {} should retry", status);
        }
        for status in [400, 401, 404] {
            let err = ModelError::ApiError {
                status,
                message: String::new(),
            };
            assert!(!err.is_retryable(), "status {} should not retry", status);
        }
    }
}
