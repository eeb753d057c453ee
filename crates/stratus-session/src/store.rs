//! The session store contract and cookie plumbing shared by backends.

use std::sync::Arc;

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, SameSite};
use http::HeaderMap;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::keys::CookieKey;
use crate::session::Session;

/// Storage abstraction for per-visitor sessions.
///
/// A store resolves the session belonging to a request from the request's
/// headers, and hands back the cookie the response must carry after a write.
/// Callers never assume the session lives in this process.
///
/// Writes are last-writer-wins: two requests updating the same session
/// concurrently can overwrite one another.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Short backend name (`securecookie`, `file`, `redis`).
    fn kind(&self) -> &'static str;

    /// Cookie and lifetime settings.
    fn config(&self) -> &SessionConfig;

    /// Look up the session for a request. Missing, forged, undecodable and
    /// expired sessions all read back as `None`.
    async fn get(&self, headers: &HeaderMap) -> Result<Option<Session>>;

    /// Persist a session, returning the cookie to set on the response.
    async fn put(&self, session: &mut Session) -> Result<Cookie<'static>>;

    /// Destroy a session, returning an expiring cookie.
    async fn remove(&self, session: &Session) -> Result<Cookie<'static>>;

    /// Delete records past their max age, returning how many were removed.
    ///
    /// Backends whose records expire on their own have nothing to do.
    async fn sweep_expired(&self) -> Result<usize> {
        Ok(0)
    }

    /// Whether the backend is reachable. Only remote backends can fail.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Shared session store for use across handlers.
pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Session id from a signed id cookie, if authentic and well formed.
pub(crate) fn signed_session_id(
    key: &CookieKey,
    headers: &HeaderMap,
    config: &SessionConfig,
) -> Option<String> {
    key.verified(headers, &config.cookie_name)
        .filter(|id| crate::session::is_well_formed_id(id))
}

/// Build the session cookie carrying `value`.
pub(crate) fn session_cookie(config: &SessionConfig, value: String) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), value))
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Lax)
        .path(config.path.clone())
        .max_age(max_age(config))
        .build()
}

/// Build a cookie that clears the session on the client.
pub(crate) fn expired_cookie(config: &SessionConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), ""))
        .http_only(true)
        .secure(config.secure)
        .path(config.path.clone())
        .max_age(time::Duration::ZERO)
        .build()
}

fn max_age(config: &SessionConfig) -> time::Duration {
    time::Duration::seconds(config.max_age.as_secs() as i64)
}
