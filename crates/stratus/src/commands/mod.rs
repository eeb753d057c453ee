//! Command implementations.

pub mod config;
pub mod serve;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;
use stratus_server::{ConsoleConfig, SessionBackend};
use stratus_server::config::DEFAULT_BUILD_INFO;

/// Console settings shared by every command. Each flag can also come from
/// the environment.
#[derive(Args, Debug, Clone)]
pub struct ConsoleArgs {
    /// OAuth client id registered with the identity provider
    #[arg(long, env = "CONSOLE_CLIENT_ID", default_value = "")]
    pub client_id: String,

    /// OAuth client secret
    #[arg(long, env = "CONSOLE_CLIENT_SECRET", default_value = "", hide_env_values = true)]
    pub client_secret: String,

    /// Public base URL of this console
    #[arg(long, env = "CONSOLE_HOSTNAME", default_value = "")]
    pub hostname: String,

    /// Login server base URL
    #[arg(long, env = "CONSOLE_LOGIN_URL", default_value = "")]
    pub login_url: String,

    /// UAA base URL
    #[arg(long, env = "CONSOLE_UAA_URL", default_value = "")]
    pub uaa_url: String,

    /// Control-plane API base URL
    #[arg(long, env = "CONSOLE_API_URL", default_value = "")]
    pub api_url: String,

    /// Log service base URL; enables /log/recent
    #[arg(long, env = "CONSOLE_LOG_URL")]
    pub log_url: Option<String>,

    /// Session backend: securecookie, file or redis
    #[arg(long, env = "SESSION_BACKEND", default_value_t = SessionBackend::File)]
    pub session_backend: SessionBackend,

    /// Key for signing and encrypting session data
    #[arg(long, env = "SESSION_KEY", hide_env_values = true)]
    pub session_key: Option<String>,

    /// Directory for the file session backend (default: a temp directory)
    #[arg(long, env = "SESSION_DIR")]
    pub session_dir: Option<PathBuf>,

    /// Redis connection URL for the redis session backend
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Redis password
    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    pub redis_password: Option<String>,

    /// Mark session cookies Secure
    #[arg(long, env = "SECURE_COOKIES", default_value_t = true, action = clap::ArgAction::Set)]
    pub secure_cookies: bool,

    /// Targets are a local platform: allows insecure cookies and skips TLS checks
    #[arg(long, env = "LOCAL_CF")]
    pub local_cf: bool,

    /// Shared secret sent to the upstream gateway with the client IP
    #[arg(long, env = "TIC_SECRET", hide_env_values = true)]
    pub tic_secret: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 9999)]
    pub port: u16,

    /// Address to bind to
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind: String,

    /// Build identifier reported by /ping
    #[arg(long, env = "BUILD_INFO", default_value = DEFAULT_BUILD_INFO)]
    pub build_info: String,
}

impl ConsoleArgs {
    /// Build and validate the console configuration.
    pub fn into_config(self) -> anyhow::Result<ConsoleConfig> {
        let addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", self.bind, e))?;

        let mut config = ConsoleConfig {
            hostname: self.hostname,
            login_url: self.login_url,
            uaa_url: self.uaa_url,
            api_url: self.api_url,
            client_id: self.client_id,
            client_secret: self.client_secret,
            session_key: self.session_key.filter(|k| !k.is_empty()),
            session_dir: self.session_dir,
            redis_url: self.redis_url.filter(|u| !u.is_empty()),
            redis_password: self.redis_password.filter(|p| !p.is_empty()),
            secure_cookies: self.secure_cookies,
            local_cf: self.local_cf,
            build_info: self.build_info,
            ..Default::default()
        }
        .with_bind_address(addr)
        .with_session_backend(self.session_backend);

        if let Some(log_url) = self.log_url {
            config = config.with_log_url(log_url);
        }
        if let Some(secret) = self.tic_secret.filter(|s| !s.is_empty()) {
            config = config.with_tic_secret(secret);
        }

        config.validate()?;
        Ok(config)
    }
}
