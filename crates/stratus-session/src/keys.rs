//! Cookie keys for the session backends.
//!
//! The cookie backend encrypts the whole session with a private jar. The
//! server-side backends only sign the session id with a signed jar.

use axum_extra::extract::cookie::{Cookie, Key};
use axum_extra::extract::{PrivateCookieJar, SignedCookieJar};
use http::HeaderMap;
use sha2::{Digest, Sha512};

use crate::error::{Result, SessionError};

/// Signing and encryption key for session cookies.
#[derive(Clone)]
pub struct CookieKey(Key);

impl std::fmt::Debug for CookieKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieKey").finish_non_exhaustive()
    }
}

impl CookieKey {
    /// Fresh random key. Cookies issued under it do not survive a restart.
    pub fn generate() -> Self {
        Self(Key::generate())
    }

    /// Derive a key from the configured session key.
    pub fn from_session_key(session_key: &[u8]) -> Result<Self> {
        if session_key.is_empty() {
            return Err(SessionError::InvalidKey(
                "session key must not be empty".to_string(),
            ));
        }
        let digest = Sha512::digest(session_key);
        Key::try_from(digest.as_slice())
            .map(Self)
            .map_err(|e| SessionError::InvalidKey(e.to_string()))
    }

    /// Replace the cookie value with its signed form.
    pub(crate) fn sign(&self, cookie: Cookie<'static>) -> Result<Cookie<'static>> {
        let name = cookie.name().to_string();
        let mut jar = cookie::CookieJar::new();
        jar.signed_mut(&self.0).add(cookie);
        jar.get(&name)
            .cloned()
            .ok_or_else(|| SessionError::InvalidCookie("signing failed".to_string()))
    }

    /// Replace the cookie value with its encrypted form.
    pub(crate) fn encrypt(&self, cookie: Cookie<'static>) -> Result<Cookie<'static>> {
        let name = cookie.name().to_string();
        let mut jar = cookie::CookieJar::new();
        jar.private_mut(&self.0).add(cookie);
        jar.get(&name)
            .cloned()
            .ok_or_else(|| SessionError::InvalidCookie("encryption failed".to_string()))
    }

    /// Value of a signed cookie, if present and authentic.
    pub(crate) fn verified(&self, headers: &HeaderMap, name: &str) -> Option<String> {
        SignedCookieJar::from_headers(headers, self.0.clone())
            .get(name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Plaintext of an encrypted cookie, if present and authentic.
    pub(crate) fn decrypted(&self, headers: &HeaderMap, name: &str) -> Option<String> {
        PrivateCookieJar::from_headers(headers, self.0.clone())
            .get(name)
            .map(|c| c.value().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::COOKIE;

    fn headers_with(cookie: &Cookie<'_>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("{}={}", cookie.name(), cookie.value()).parse().unwrap(),
        );
        headers
    }

    #[test]
    fn test_signed_value_roundtrip() {
        let key = CookieKey::from_session_key(b"secret").unwrap();
        let signed = key.sign(Cookie::new("session", "abc")).unwrap();
        assert_ne!(signed.value(), "abc");
        assert_eq!(
            key.verified(&headers_with(&signed), "session").as_deref(),
            Some("abc")
        );

        let other = CookieKey::from_session_key(b"other-secret").unwrap();
        assert_eq!(other.verified(&headers_with(&signed), "session"), None);

        let unsigned = Cookie::new("session", "abc");
        assert_eq!(key.verified(&headers_with(&unsigned), "session"), None);
    }

    #[test]
    fn test_encrypted_value_is_opaque() {
        let key = CookieKey::generate();
        let sealed = key.encrypt(Cookie::new("session", "{\"a\":1}")).unwrap();
        assert!(!sealed.value().contains("\"a\""));
        assert_eq!(
            key.decrypted(&headers_with(&sealed), "session").as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(
            CookieKey::generate().decrypted(&headers_with(&sealed), "session"),
            None
        );
    }

    #[test]
    fn test_encrypted_value_is_bound_to_cookie_name() {
        let key = CookieKey::generate();
        let sealed = key.encrypt(Cookie::new("session", "data")).unwrap();
        let moved = Cookie::new("other", sealed.value().to_string());
        assert_eq!(key.decrypted(&headers_with(&moved), "other"), None);
    }

    #[test]
    fn test_sealing_keeps_attributes() {
        let key = CookieKey::generate();
        let cookie = Cookie::build(("session", "v")).http_only(true).path("/").build();
        let sealed = key.encrypt(cookie).unwrap();
        assert_eq!(sealed.http_only(), Some(true));
        assert_eq!(sealed.path(), Some("/"));
    }

    #[test]
    fn test_session_key_must_not_be_empty() {
        assert!(CookieKey::from_session_key(b"").is_err());
    }
}
