//! OAuth2 grants against the identity provider's token endpoint.
//!
//! All grants are form-encoded POSTs authenticated with HTTP basic client
//! credentials, made through the shared transport so the request timeout
//! and TLS settings apply.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::RngCore;
use url::Url;

use crate::config::{OAuthConfig, PrivilegedConfig};
use crate::error::{OAuthError, Result};
use crate::token::{OAuthToken, TokenResponse};

/// Generate a random state string for CSRF protection.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Build the authorization URL the browser is redirected to at login.
pub fn build_authorization_url(config: &OAuthConfig, state: &str) -> Result<Url> {
    let mut url = Url::parse(&config.auth_url)
        .map_err(|e| OAuthError::Config(format!("Invalid auth URL '{}': {}", config.auth_url, e)))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_url)
        .append_pair("scope", &config.scopes.join(" "))
        .append_pair("state", state);
    Ok(url)
}

/// Exchange an authorization code for a token.
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<OAuthToken> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_url.as_str()),
    ];
    request_token(
        http,
        &config.token_url,
        &config.client_id,
        &config.client_secret,
        &params,
        "Token exchange",
    )
    .await
}

/// Refresh an expired token.
///
/// Providers may omit the refresh token in the response; the old one is kept.
pub async fn refresh_token(
    http: &reqwest::Client,
    config: &OAuthConfig,
    refresh_token: &str,
) -> Result<OAuthToken> {
    let params = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];
    let mut token = request_token(
        http,
        &config.token_url,
        &config.client_id,
        &config.client_secret,
        &params,
        "Token refresh",
    )
    .await?;
    if token.refresh_token.is_none() {
        token.refresh_token = Some(refresh_token.to_string());
    }
    Ok(token)
}

/// Obtain an application token with the client-credentials grant.
pub async fn client_credentials(
    http: &reqwest::Client,
    config: &PrivilegedConfig,
) -> Result<OAuthToken> {
    let scope = config.scopes.join(" ");
    let params = [
        ("grant_type", "client_credentials"),
        ("scope", scope.as_str()),
    ];
    request_token(
        http,
        &config.token_url,
        &config.client_id,
        &config.client_secret,
        &params,
        "Client credentials grant",
    )
    .await
}

async fn request_token(
    http: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    params: &[(&str, &str)],
    what: &str,
) -> Result<OAuthToken> {
    let response = http
        .post(token_url)
        .basic_auth(client_id, Some(client_secret))
        .header(reqwest::header::ACCEPT, "application/json")
        .form(params)
        .send()
        .await
        .map_err(|e| OAuthError::Network(format!("{} request failed: {}", what, e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(OAuthError::Backend(format!(
            "{} failed ({}): {}",
            what, status, error_text
        )));
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| OAuthError::Backend(format!("Failed to parse token response: {}", e)))?;
    if body.access_token.is_empty() {
        return Err(OAuthError::InvalidToken(
            "token response has no access_token".to_string(),
        ));
    }

    Ok(body.into_token(Utc::now()))
}
