//! The OAuth token record kept in each session.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, Result};

/// An access token with its optional refresh token and expiry.
///
/// A token is either present and unexpired, or treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// `None` means the provider did not say; such tokens never expire locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl OAuthToken {
    /// Whether the token can be used at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.expiry.is_none_or(|expiry| expiry > now)
    }

    /// Email claim of the access token.
    ///
    /// The JWT signature is not checked: the token came from our own session.
    pub fn email(&self) -> Result<String> {
        let claims = self.claims()?;
        claims
            .get("email")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| OAuthError::InvalidToken("no email claim".to_string()))
    }

    fn claims(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let payload = self
            .access_token
            .split('.')
            .nth(1)
            .ok_or_else(|| OAuthError::InvalidToken("access token is not a JWT".to_string()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| OAuthError::InvalidToken(format!("bad JWT payload: {}", e)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Token endpoint response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    /// Convert into a stored token, computing the absolute expiry from `now`.
    pub fn into_token(self, now: DateTime<Utc>) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            token_type: self.token_type,
            refresh_token: self.refresh_token,
            expiry: self
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now + Duration::seconds(secs)),
        }
    }
}

#[cfg(test)]
pub(crate) fn jwt_with_claims(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let body = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, body)
}
