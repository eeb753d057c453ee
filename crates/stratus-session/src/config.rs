//! Configuration shared by every session backend.

use std::time::Duration;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "session";

/// Sessions never outlive seven days, whatever the backend.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Upper bound on a serialized session (cookie value or stored record).
pub const DEFAULT_MAX_LENGTH: usize = 4096 * 4;

/// Cookie and lifetime settings applied by all backends.
///
/// The HTTP-only flag is not configurable: session cookies are always
/// unreadable from scripts.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session (or its signed id).
    pub cookie_name: String,

    /// Cookie path.
    pub path: String,

    /// Whether the cookie carries the `Secure` attribute.
    pub secure: bool,

    /// Maximum session age; older records read back as absent.
    pub max_age: Duration,

    /// Maximum serialized size in bytes; larger sessions are rejected.
    pub max_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            path: "/".to_string(),
            secure: true,
            max_age: DEFAULT_MAX_AGE,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `Secure` cookie attribute.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the maximum session age. Values above seven days are clamped.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age.min(DEFAULT_MAX_AGE);
        self
    }

    /// Set the maximum serialized session length.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Check a serialized size against the configured limit.
    pub fn check_length(&self, size: usize) -> crate::Result<()> {
        if size > self.max_length {
            return Err(crate::SessionError::TooLarge {
                size,
                max: self.max_length,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.cookie_name, "session");
        assert_eq!(config.max_age, Duration::from_secs(604_800));
        assert_eq!(config.max_length, 16_384);
        assert!(config.secure);
    }

    #[test]
    fn test_max_age_is_clamped() {
        let config = SessionConfig::new().with_max_age(Duration::from_secs(60 * 60 * 24 * 30));
        assert_eq!(config.max_age, DEFAULT_MAX_AGE);

        let config = SessionConfig::new().with_max_age(Duration::from_secs(60));
        assert_eq!(config.max_age, Duration::from_secs(60));
    }

    #[test]
    fn test_check_length() {
        let config = SessionConfig::new().with_max_length(10);
        assert!(config.check_length(10).is_ok());
        assert!(matches!(
            config.check_length(11),
            Err(crate::SessionError::TooLarge { size: 11, max: 10 })
        ));
    }
}
