//! Client-held sessions in an encrypted, signed cookie.

use async_trait::async_trait;
use axum_extra::extract::cookie::Cookie;
use chrono::Utc;
use http::HeaderMap;
use tracing::debug;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::keys::CookieKey;
use crate::session::Session;
use crate::store::{SessionStore, expired_cookie, session_cookie};

/// Stateless backend: the whole session travels in the cookie.
///
/// The key is generated at construction, so all sessions are lost when the
/// process restarts.
#[derive(Debug)]
pub struct CookieStore {
    key: CookieKey,
    config: SessionConfig,
}

impl CookieStore {
    /// Create a store with a freshly generated key.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_key(CookieKey::generate(), config)
    }

    /// Create a store around an existing key.
    pub fn with_key(key: CookieKey, config: SessionConfig) -> Self {
        Self { key, config }
    }

    fn seal(&self, session: &Session) -> Result<Cookie<'static>> {
        let payload = String::from_utf8(session.to_bytes()?)
            .map_err(|e| SessionError::InvalidCookie(e.to_string()))?;
        self.key.encrypt(session_cookie(&self.config, payload))
    }
}

#[async_trait]
impl SessionStore for CookieStore {
    fn kind(&self) -> &'static str {
        "securecookie"
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn get(&self, headers: &HeaderMap) -> Result<Option<Session>> {
        let Some(payload) = self.key.decrypted(headers, &self.config.cookie_name) else {
            return Ok(None);
        };

        let session = match Session::from_bytes(payload.as_bytes()) {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "Discarding malformed session payload");
                return Ok(None);
            }
        };

        if session.is_expired(self.config.max_age, Utc::now()) {
            debug!(session_id = %session.id(), "Session cookie expired");
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn put(&self, session: &mut Session) -> Result<Cookie<'static>> {
        session.touch();
        let cookie = self.seal(session)?;
        self.config.check_length(cookie.value().len())?;
        Ok(cookie)
    }

    async fn remove(&self, _session: &Session) -> Result<Cookie<'static>> {
        Ok(expired_cookie(&self.config))
    }
}
