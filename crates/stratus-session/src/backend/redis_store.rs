//! Server-side sessions stored in Redis.

use std::time::Duration;

use async_trait::async_trait;
use axum_extra::extract::cookie::Cookie;
use chrono::{DateTime, Utc};
use http::HeaderMap;
use tracing::{debug, error, warn};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::keys::CookieKey;
use crate::pool::RedisPool;
use crate::session::Session;
use crate::store::{SessionStore, expired_cookie, session_cookie, signed_session_id};

/// Key prefix for session records.
const KEY_PREFIX: &str = "session_";

/// Redis backend; records expire server-side after the session max age.
#[derive(Debug)]
pub struct RedisStore {
    pool: RedisPool,
    key: CookieKey,
    config: SessionConfig,
}

impl RedisStore {
    pub fn new(pool: RedisPool, session_key: &[u8], config: SessionConfig) -> Result<Self> {
        Ok(Self {
            pool,
            key: CookieKey::from_session_key(session_key)?,
            config,
        })
    }

    fn key_for(id: &str) -> String {
        format!("{}{}", KEY_PREFIX, id)
    }
}

/// Decide whether a stored record is the live session `id`.
///
/// Records for another id, past `max_age`, or that fail to parse are
/// treated as absent.
fn accept_record(bytes: &[u8], id: &str, max_age: Duration, now: DateTime<Utc>) -> Option<Session> {
    match Session::from_bytes(bytes) {
        Ok(session) if session.id() != id => {
            warn!(session_id = %id, "Discarding session record stored under another id");
            None
        }
        Ok(session) if session.is_expired(max_age, now) => {
            debug!(session_id = %id, "Session record expired");
            None
        }
        Ok(session) => Some(session),
        Err(e) => {
            warn!(session_id = %id, error = %e, "Discarding corrupt session record");
            None
        }
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    fn kind(&self) -> &'static str {
        "redis"
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn get(&self, headers: &HeaderMap) -> Result<Option<Session>> {
        let Some(id) = signed_session_id(&self.key, headers, &self.config) else {
            return Ok(None);
        };

        let key = Self::key_for(&id);
        let bytes: Option<Vec<u8>> = self
            .pool
            .run(move |conn| redis::cmd("GET").arg(&key).query(conn))
            .await?;
        let Some(bytes) = bytes else {
            return Ok(None);
        };

        Ok(accept_record(&bytes, &id, self.config.max_age, Utc::now()))
    }

    async fn put(&self, session: &mut Session) -> Result<Cookie<'static>> {
        session.touch();
        let bytes = session.to_bytes()?;
        self.config.check_length(bytes.len())?;

        let key = Self::key_for(session.id());
        let ttl = self.config.max_age.as_secs().max(1);
        self.pool
            .run(move |conn| {
                redis::cmd("SETEX")
                    .arg(&key)
                    .arg(ttl)
                    .arg(bytes)
                    .query::<()>(conn)
            })
            .await?;

        self.key
            .sign(session_cookie(&self.config, session.id().to_string()))
    }

    async fn remove(&self, session: &Session) -> Result<Cookie<'static>> {
        let key = Self::key_for(session.id());
        self.pool
            .run(move |conn| redis::cmd("DEL").arg(&key).query::<()>(conn))
            .await?;
        Ok(expired_cookie(&self.config))
    }

    async fn check_health(&self) -> bool {
        match self
            .pool
            .run(|conn| redis::cmd("PING").query::<String>(conn))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                error!(health_check_error = %e, "Session store health check failed");
                false
            }
        }
    }
}
