//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Redis-specific error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// SQL backend error
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Backend I/O failure not covered by a dedicated variant
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// Wrap a `serde_json` encoding failure.
    pub(crate) fn serialization(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }

    /// Wrap a `serde_json` decoding failure.
    pub(crate) fn deserialization(err: serde_json::Error) -> Self {
        SessionError::Deserialization(err.to_string())
    }
}
