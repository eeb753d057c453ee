//! Error types for session storage.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Serialized session exceeds the configured maximum length.
    #[error("Session too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    /// Cookie failed authentication, decryption or decoding.
    #[error("Invalid session cookie: {0}")]
    InvalidCookie(String),

    /// Session record is older than the configured maximum age.
    #[error("Session expired: {0}")]
    Expired(String),

    /// Key material is missing or has the wrong length.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Filesystem backend error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote key-value backend error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// No pooled connection became available in time.
    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Backend reached but unusable (timeouts, worker failures, bad URLs).
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, SessionError>;
