//! Shared fixtures for unit tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum_extra::extract::cookie::Cookie;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use stratus_oauth::OAuthToken;
use stratus_session::{CookieStore, Session, SessionConfig, SharedSessionStore};
use wiremock::MockServer;

use crate::config::{ConsoleConfig, SessionBackend};
use crate::notify::{SharedMailer, TracingMailer};
use crate::state::AppState;

pub(crate) const USER_EMAIL: &str = "user@example.gov";

/// A user access token carrying an email claim.
pub(crate) fn user_jwt() -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"email":"{}"}}"#, USER_EMAIL));
    format!("{}.{}.sig", header, claims)
}

pub(crate) fn token_valid_for(delta: Duration) -> OAuthToken {
    OAuthToken {
        access_token: user_jwt(),
        token_type: "bearer".to_string(),
        refresh_token: Some("refresh".to_string()),
        expiry: Some(Utc::now() + delta),
    }
}

/// App state wired to fake identity provider, control-plane and log servers.
pub(crate) struct TestConsole {
    pub state: AppState,
    pub uaa: MockServer,
    pub api: MockServer,
    pub logs: MockServer,
}

impl TestConsole {
    pub async fn start() -> Self {
        Self::start_with_mailer(Arc::new(TracingMailer)).await
    }

    pub async fn start_with_mailer(mailer: SharedMailer) -> Self {
        Self::start_with(mailer, |config| config).await
    }

    pub async fn start_with(
        mailer: SharedMailer,
        tweak: impl FnOnce(ConsoleConfig) -> ConsoleConfig,
    ) -> Self {
        let uaa = MockServer::start().await;
        let api = MockServer::start().await;
        let logs = MockServer::start().await;

        let config = ConsoleConfig {
            hostname: "https://console.example.com".to_string(),
            login_url: "https://login.example.com".to_string(),
            uaa_url: uaa.uri(),
            api_url: api.uri(),
            client_id: "console".to_string(),
            client_secret: "secret".to_string(),
            secure_cookies: false,
            local_cf: true,
            ..Default::default()
        }
        .with_session_backend(SessionBackend::SecureCookie)
        .with_log_url(logs.uri());
        let config = tweak(config);

        let store: SharedSessionStore =
            Arc::new(CookieStore::new(SessionConfig::default().with_secure(false)));
        let state = AppState::new(config, store, mailer).unwrap();

        Self {
            state,
            uaa,
            api,
            logs,
        }
    }

    /// Persist a session holding `token`, returning its cookie.
    pub async fn login(&self, token: OAuthToken) -> Cookie<'static> {
        let mut session = Session::new();
        self.state
            .tokens
            .store_token(&mut session, &token)
            .await
            .unwrap()
    }

    pub fn request(&self, method: &str, uri: &str, cookie: &Cookie<'_>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("cookie", format!("{}={}", cookie.name(), cookie.value()))
            .body(Body::empty())
            .unwrap()
    }
}
