//! Error types for the OAuth and proxy layer.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while acquiring tokens or proxying requests.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// Identity provider or upstream API returned an error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Token is missing a field we need, or cannot be decoded.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Session store failure while persisting a token.
    #[error("Session error: {0}")]
    Session(#[from] stratus_session::SessionError),
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for OAuthError {
    fn from(e: serde_json::Error) -> Self {
        OAuthError::Serialization(e.to_string())
    }
}
