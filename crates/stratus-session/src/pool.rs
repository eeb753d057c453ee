//! Connection pool for the Redis backend.
//!
//! Connections use the synchronous redis client so socket read and write
//! timeouts apply to every command. Work runs on the blocking thread pool.

use std::time::Duration;

use tracing::debug;

use crate::error::{Result, SessionError};

/// Pool tuning.
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    /// Connections kept for reuse.
    pub max_idle: usize,
    /// Idle connections older than this are closed instead of reused.
    pub idle_timeout: Duration,
    /// How long a checkout may wait for a usable connection.
    pub connect_timeout: Duration,
    /// Per-command read timeout.
    pub read_timeout: Duration,
    /// Per-command write timeout.
    pub write_timeout: Duration,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            max_idle: 10,
            idle_timeout: Duration::from_secs(240),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// Applies socket timeouts to every new connection.
#[derive(Debug)]
struct SocketTimeouts {
    read: Duration,
    write: Duration,
}

impl r2d2::CustomizeConnection<redis::Connection, redis::RedisError> for SocketTimeouts {
    fn on_acquire(&self, conn: &mut redis::Connection) -> redis::RedisResult<()> {
        conn.set_read_timeout(Some(self.read))?;
        conn.set_write_timeout(Some(self.write))?;
        debug!("Opened redis connection");
        Ok(())
    }
}

/// Pool of authenticated Redis connections.
///
/// Connections are checked with `PING` before reuse.
#[derive(Clone)]
pub struct RedisPool {
    pool: r2d2::Pool<redis::Client>,
    config: RedisPoolConfig,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("config", &self.config)
            .field("idle", &self.idle_count())
            .finish()
    }
}

impl RedisPool {
    /// Build a pool for `url`; a non-empty `password` replaces any password in the URL.
    ///
    /// No connection is made until the first command.
    pub fn new(url: &str, password: Option<&str>, config: RedisPoolConfig) -> Result<Self> {
        let url = with_password(url, password)?;
        let client = redis::Client::open(url.as_str())?;
        let max_size = u32::try_from(config.max_idle.max(1)).unwrap_or(u32::MAX);

        let pool = r2d2::Pool::builder()
            .max_size(max_size)
            .min_idle(Some(0))
            .idle_timeout(Some(config.idle_timeout))
            .connection_timeout(config.connect_timeout)
            .test_on_check_out(true)
            .connection_customizer(Box::new(SocketTimeouts {
                read: config.read_timeout,
                write: config.write_timeout,
            }))
            .build_unchecked(client);

        Ok(Self { pool, config })
    }

    /// Number of idle connections currently held.
    pub fn idle_count(&self) -> usize {
        self.pool.state().idle_connections as usize
    }

    /// Run `f` with a pooled connection on the blocking thread pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut redis::Connection) -> redis::RedisResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T> {
            let mut conn = pool.get()?;
            Ok(f(&mut conn)?)
        })
        .await
        .map_err(|e| SessionError::Backend(format!("redis task failed: {}", e)))?
    }
}

/// Host and port of a redis URL, for messages that must not leak credentials.
fn redacted(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(url) => format!(
            "{}://{}:{}",
            url.scheme(),
            url.host_str().unwrap_or("?"),
            url.port().unwrap_or(6379)
        ),
        Err(_) => "<unparseable>".to_string(),
    }
}

fn with_password(raw: &str, password: Option<&str>) -> Result<url::Url> {
    let mut url = url::Url::parse(raw)
        .map_err(|e| SessionError::Backend(format!("invalid redis url: {}", e)))?;
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        url.set_password(Some(password)).map_err(|_| {
            SessionError::Backend(format!("cannot set password on {}", redacted(raw)))
        })?;
    }
    Ok(url)
}
