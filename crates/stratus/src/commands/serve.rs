//! Serve command - runs the console server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use stratus_server::{AppState, ConsoleConfig, Server, SessionBackend, TracingMailer};
use stratus_session::{
    CookieStore, FileStore, RedisPool, RedisPoolConfig, RedisStore, SharedSessionStore,
};

use super::ConsoleArgs;

/// How often expired session records are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub console: ConsoleArgs,
}

/// Run the serve command.
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = args.console.into_config()?;
    let store = build_store(&config)?;

    info!(
        backend = %config.session_backend,
        build = %config.build_info,
        local = config.local_cf,
        "Configuration loaded"
    );

    let sweeper = tokio::spawn(sweep_sessions(Arc::clone(&store), SWEEP_INTERVAL));
    let state = AppState::new(config, store, Arc::new(TracingMailer))?;
    let server = Server::new(state);
    info!(addr = %server.bind_address(), "Listening");

    server
        .run_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    sweeper.abort();
    Ok(())
}

/// Delete expired session records every `every` until aborted.
async fn sweep_sessions(store: SharedSessionStore, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match store.sweep_expired().await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, store = store.kind(), "Session sweep finished"),
            Err(e) => warn!(error = %e, store = store.kind(), "Session sweep failed"),
        }
    }
}

/// Open the session store the configuration selects.
pub fn build_store(config: &ConsoleConfig) -> Result<SharedSessionStore> {
    let session_config = config.session_config();
    let key = config.session_key.as_deref().unwrap_or_default().as_bytes();

    let store: SharedSessionStore = match config.session_backend {
        SessionBackend::SecureCookie => Arc::new(CookieStore::new(session_config)),
        SessionBackend::File => match &config.session_dir {
            Some(dir) => Arc::new(FileStore::new(dir, key, session_config)?),
            None => Arc::new(FileStore::in_temp_dir(key, session_config)?),
        },
        SessionBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("redis backend needs a redis url"))?;
            let pool = RedisPool::new(
                url,
                config.redis_password.as_deref(),
                RedisPoolConfig::default(),
            )?;
            Arc::new(RedisStore::new(pool, key, session_config)?)
        }
    };

    info!(store = store.kind(), "Session store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: SessionBackend) -> ConsoleConfig {
        ConsoleConfig {
            session_key: Some("k".repeat(32)),
            ..Default::default()
        }
        .with_session_backend(backend)
    }

    #[test]
    fn test_build_cookie_store() {
        let store = build_store(&config(SessionBackend::SecureCookie)).unwrap();
        assert_eq!(store.kind(), "securecookie");
    }

    #[test]
    fn test_build_file_store_in_temp_dir() {
        let store = build_store(&config(SessionBackend::File)).unwrap();
        assert_eq!(store.kind(), "file");
    }

    #[tokio::test]
    async fn test_sweeper_removes_dead_session_files() {
        let dir = tempfile::tempdir().unwrap();
        let dead = dir.path().join(format!("session_{}", "a".repeat(43)));
        std::fs::write(&dead, b"not a session").unwrap();

        let mut config = config(SessionBackend::File);
        config.session_dir = Some(dir.path().to_path_buf());
        let store = build_store(&config).unwrap();

        let sweeper = tokio::spawn(sweep_sessions(store, Duration::from_millis(10)));
        for _ in 0..50 {
            if !dead.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        sweeper.abort();
        assert!(!dead.exists());
    }

    #[test]
    fn test_redis_needs_url() {
        assert!(build_store(&config(SessionBackend::Redis)).is_err());
    }
}
