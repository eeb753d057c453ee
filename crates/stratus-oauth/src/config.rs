//! OAuth client settings and the shared outbound HTTP transport.

use std::time::Duration;

use crate::error::{OAuthError, Result};

/// Time budget for every outbound call (token endpoint and control-plane API).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Scopes requested on behalf of a signed-in user.
pub const USER_SCOPES: &[&str] = &[
    "cloud_controller.read",
    "cloud_controller.write",
    "cloud_controller.admin",
    "scim.read",
    "openid",
];

/// Scopes requested by the application's own identity.
pub const PRIVILEGED_SCOPES: &[&str] = &["scim.invite", "cloud_controller.admin", "scim.read"];

/// Authorization-code client used for signed-in users.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Build the user client config from the console's base URLs.
    ///
    /// Authorization happens on the login server; tokens come from the UAA.
    pub fn for_console(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        hostname: &str,
        login_url: &str,
        uaa_url: &str,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: format!("{}/oauth/authorize", login_url.trim_end_matches('/')),
            token_url: format!("{}/oauth/token", uaa_url.trim_end_matches('/')),
            redirect_url: format!("{}/oauth2callback", hostname.trim_end_matches('/')),
            scopes: USER_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Override the requested scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

/// Client-credentials client used for privileged, user-independent calls.
#[derive(Debug, Clone)]
pub struct PrivilegedConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

impl PrivilegedConfig {
    /// Share the user client's credentials and token endpoint with elevated scopes.
    pub fn from_oauth(config: &OAuthConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
            scopes: PRIVILEGED_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Build the outbound HTTP transport.
///
/// Every request made through it is bounded by [`REQUEST_TIMEOUT`].
/// `insecure_tls` disables certificate verification and must only be set for
/// local development targets.
pub fn build_http_client(insecure_tls: bool) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none());
    if insecure_tls {
        tracing::warn!("TLS certificate verification disabled for outbound requests");
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder
        .build()
        .map_err(|e| OAuthError::Config(format!("Failed to build HTTP client: {}", e)))
}
