//! Memory store errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MemoryError {
    #[error("Memory entry not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl MemoryError {
    /// Transient failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MemoryError::RateLimited(_) | MemoryError::ConnectionError(_) | MemoryError::Timeout(_)
        )
    }
}
