//! Console configuration.
//!
//! Built once at startup and shared by `Arc`; nothing reads settings from
//! ambient state after that.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use stratus_oauth::{OAuthConfig, PrivilegedConfig, ProxyConfig, REQUEST_TIMEOUT};
use stratus_session::SessionConfig;

/// Default build identifier reported by `/ping`.
pub const DEFAULT_BUILD_INFO: &str = "developer-build";

/// Whole-request timeout applied to every route.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = REQUEST_TIMEOUT;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("cannot run with insecure cookies when targeting a production environment")]
    InsecureCookies,

    #[error("unknown session backend '{0}' (expected securecookie, file or redis)")]
    UnknownBackend(String),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Where sessions are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionBackend {
    /// Encrypted cookie, nothing server-side.
    SecureCookie,
    /// One file per session on local disk.
    #[default]
    File,
    /// Shared Redis instance.
    Redis,
}

impl SessionBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionBackend::SecureCookie => "securecookie",
            SessionBackend::File => "file",
            SessionBackend::Redis => "redis",
        }
    }
}

impl fmt::Display for SessionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "securecookie" => Ok(SessionBackend::SecureCookie),
            "file" | "" => Ok(SessionBackend::File),
            "redis" => Ok(SessionBackend::Redis),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Console configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Public URL of this console; OAuth redirects and email links use it.
    pub hostname: String,

    /// Login server (authorization endpoint, profile and logout pages).
    pub login_url: String,

    /// UAA (token endpoint, userinfo).
    pub uaa_url: String,

    /// Control-plane API proxied under `/v2`.
    pub api_url: String,

    /// Log service behind `/log`. The route is not mounted when unset.
    pub log_url: Option<String>,

    pub client_id: String,
    pub client_secret: String,

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────
    pub session_backend: SessionBackend,

    /// Signing key for server-side session ids.
    pub session_key: Option<String>,

    /// Directory for the file backend (system temp dir when unset).
    pub session_dir: Option<PathBuf>,

    pub redis_url: Option<String>,
    pub redis_password: Option<String>,

    /// Set the `Secure` flag on session cookies.
    pub secure_cookies: bool,

    /// Targeting a local development environment: allows insecure cookies
    /// and disables TLS verification on outbound calls.
    pub local_cf: bool,

    /// Shared secret for the trusted-gateway headers.
    pub tic_secret: Option<String>,

    /// Build identifier reported by `/ping`.
    pub build_info: String,

    /// Whole-request timeout.
    pub request_timeout: Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 9999)),
            hostname: String::new(),
            login_url: String::new(),
            uaa_url: String::new(),
            api_url: String::new(),
            log_url: None,
            client_id: String::new(),
            client_secret: String::new(),
            session_backend: SessionBackend::default(),
            session_key: None,
            session_dir: None,
            redis_url: None,
            redis_password: None,
            secure_cookies: true,
            local_cf: false,
            tic_secret: None,
            build_info: DEFAULT_BUILD_INFO.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ConsoleConfig {
    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the session backend.
    pub fn with_session_backend(mut self, backend: SessionBackend) -> Self {
        self.session_backend = backend;
        self
    }

    /// Set the log service URL.
    pub fn with_log_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.log_url = (!url.trim().is_empty()).then_some(url);
        self
    }

    /// Set the shared gateway secret.
    pub fn with_tic_secret(mut self, secret: impl Into<String>) -> Self {
        self.tic_secret = Some(secret.into());
        self
    }

    /// Check the configuration before serving any traffic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("client id", &self.client_id),
            ("client secret", &self.client_secret),
            ("hostname", &self.hostname),
            ("login url", &self.login_url),
            ("uaa url", &self.uaa_url),
            ("api url", &self.api_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(field));
            }
        }

        for (field, value) in [
            ("hostname", &self.hostname),
            ("login url", &self.login_url),
            ("uaa url", &self.uaa_url),
            ("api url", &self.api_url),
        ] {
            url::Url::parse(value).map_err(|e| ConfigError::Invalid {
                field,
                reason: e.to_string(),
            })?;
        }

        if let Some(log_url) = &self.log_url {
            url::Url::parse(log_url).map_err(|e| ConfigError::Invalid {
                field: "log url",
                reason: e.to_string(),
            })?;
        }

        if !self.local_cf && !self.secure_cookies {
            return Err(ConfigError::InsecureCookies);
        }

        match self.session_backend {
            SessionBackend::SecureCookie => {}
            SessionBackend::File => {
                self.require_session_key()?;
            }
            SessionBackend::Redis => {
                self.require_session_key()?;
                if self.redis_url.as_deref().is_none_or(|u| u.trim().is_empty()) {
                    return Err(ConfigError::Missing("redis url"));
                }
            }
        }

        Ok(())
    }

    fn require_session_key(&self) -> Result<&str, ConfigError> {
        self.session_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::Missing("session key"))
    }

    /// The signed-in user's OAuth client.
    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig::for_console(
            &self.client_id,
            &self.client_secret,
            &self.hostname,
            &self.login_url,
            &self.uaa_url,
        )
    }

    /// The application's own client-credentials client.
    pub fn privileged_config(&self) -> PrivilegedConfig {
        PrivilegedConfig::from_oauth(&self.oauth_config())
    }

    /// Reverse proxy settings.
    pub fn proxy_config(&self) -> ProxyConfig {
        match &self.tic_secret {
            Some(secret) => ProxyConfig::default().with_tic_secret(secret.clone()),
            None => ProxyConfig::default(),
        }
    }

    /// Session cookie settings.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default().with_secure(self.secure_cookies)
    }

    /// Outbound calls skip TLS verification only for local targets.
    pub fn insecure_tls(&self) -> bool {
        self.local_cf
    }

    /// Where the browser lands after login.
    pub fn dashboard_url(&self) -> String {
        format!("{}/#/dashboard", self.hostname.trim_end_matches('/'))
    }
}
