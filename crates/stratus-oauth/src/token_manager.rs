//! Per-session token validation and refresh.
//!
//! The token lives in the session under [`TOKEN_KEY`]. A session moves
//! through `NoToken -> Valid -> Refreshing -> Valid | Invalid`; callers only
//! ever see "a usable token" or "no valid token".

use std::sync::Arc;

use axum_extra::extract::cookie::Cookie;
use chrono::Utc;
use stratus_session::{Session, SharedSessionStore};
use tracing::{debug, warn};

use crate::config::OAuthConfig;
use crate::error::{OAuthError, Result};
use crate::oauth::refresh_token;
use crate::token::OAuthToken;

/// Session key holding the user's [`OAuthToken`].
pub const TOKEN_KEY: &str = "token";

/// A token that can be used right now.
#[derive(Debug, Clone)]
pub struct ValidToken {
    pub token: OAuthToken,
    /// Set when the token was refreshed and the session rewritten; the
    /// response must carry this cookie.
    pub cookie: Option<Cookie<'static>>,
}

/// Shared token manager for use across handlers.
pub type SharedTokenManager = Arc<TokenManager>;

/// Validates session tokens and performs the refresh-and-persist cycle.
#[derive(Debug, Clone)]
pub struct TokenManager {
    store: SharedSessionStore,
    config: Arc<OAuthConfig>,
    http: reqwest::Client,
}

impl TokenManager {
    /// `http` must carry the request timeout (see [`crate::build_http_client`]).
    pub fn new(store: SharedSessionStore, config: Arc<OAuthConfig>, http: reqwest::Client) -> Self {
        Self {
            store,
            config,
            http,
        }
    }

    pub fn store(&self) -> &SharedSessionStore {
        &self.store
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Return a usable token for the session, refreshing it at most once.
    ///
    /// Any failure (no token, no refresh token, provider or transport error,
    /// store error) yields `None`. On failure the session is left untouched.
    pub async fn get_valid_token(&self, session: &mut Session) -> Option<ValidToken> {
        let token: OAuthToken = session.get(TOKEN_KEY)?;
        if token.is_valid(Utc::now()) {
            return Some(ValidToken {
                token,
                cookie: None,
            });
        }

        match self.refresh(session, &token).await {
            Ok(valid) => Some(valid),
            Err(e) => {
                warn!(session_id = %session.id(), error = %e, "Token refresh failed");
                None
            }
        }
    }

    /// Store a freshly obtained token in the session and persist it.
    ///
    /// The session is only updated if the store accepted the write.
    pub async fn store_token(
        &self,
        session: &mut Session,
        token: &OAuthToken,
    ) -> Result<Cookie<'static>> {
        let mut updated = session.clone();
        updated.insert(TOKEN_KEY, token)?;
        let cookie = self.store.put(&mut updated).await?;
        *session = updated;
        Ok(cookie)
    }

    async fn refresh(&self, session: &mut Session, token: &OAuthToken) -> Result<ValidToken> {
        let refresh = token
            .refresh_token
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| OAuthError::InvalidToken("expired token has no refresh token".to_string()))?;

        debug!(session_id = %session.id(), "Refreshing expired token");
        let fresh = refresh_token(&self.http, &self.config, refresh).await?;
        let cookie = self.store_token(session, &fresh).await?;

        Ok(ValidToken {
            token: fresh,
            cookie: Some(cookie),
        })
    }
}
