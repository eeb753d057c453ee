//! Credential clients: one acting as the signed-in user, one as the
//! application itself.
//!
//! The two types are deliberately not interchangeable. A route can only make
//! privileged calls if it was handed a [`PrivilegedClientFactory`].

use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use url::Url;

use crate::config::{PrivilegedConfig, REQUEST_TIMEOUT};
use crate::error::Result;
use crate::oauth::client_credentials;
use crate::token::OAuthToken;

mod sealed {
    pub trait Sealed {}
}

/// An HTTP client bound to exactly one bearer token.
pub trait AuthorizedClient: sealed::Sealed + Send + Sync {
    /// Which identity this client acts as, for logs.
    fn identity(&self) -> &'static str;

    #[doc(hidden)]
    fn http(&self) -> &reqwest::Client;

    #[doc(hidden)]
    fn token(&self) -> &OAuthToken;

    /// Start a bearer-authenticated request with the fixed request timeout.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http()
            .request(method, url)
            .bearer_auth(&self.token().access_token)
            .timeout(REQUEST_TIMEOUT)
    }

    fn get(&self, url: Url) -> RequestBuilder {
        self.request(Method::GET, url)
    }
}

/// Acts as the signed-in user, with that user's session token.
#[derive(Debug, Clone)]
pub struct UserClient {
    http: reqwest::Client,
    token: OAuthToken,
}

impl sealed::Sealed for UserClient {}

impl AuthorizedClient for UserClient {
    fn identity(&self) -> &'static str {
        "user"
    }

    fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn token(&self) -> &OAuthToken {
        &self.token
    }
}

/// Acts as the application with elevated, user-independent scopes.
#[derive(Debug, Clone)]
pub struct PrivilegedClient {
    http: reqwest::Client,
    token: OAuthToken,
}

impl sealed::Sealed for PrivilegedClient {}

impl AuthorizedClient for PrivilegedClient {
    fn identity(&self) -> &'static str {
        "privileged"
    }

    fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn token(&self) -> &OAuthToken {
        &self.token
    }
}

/// Builds [`UserClient`]s from session tokens.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    http: reqwest::Client,
}

impl ClientFactory {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// A client for one outbound call as the owner of `token`.
    pub fn user_client(&self, token: OAuthToken) -> UserClient {
        UserClient {
            http: self.http.clone(),
            token,
        }
    }
}

/// Builds [`PrivilegedClient`]s via the client-credentials grant.
#[derive(Debug, Clone)]
pub struct PrivilegedClientFactory {
    http: reqwest::Client,
    config: Arc<PrivilegedConfig>,
}

impl PrivilegedClientFactory {
    pub fn new(http: reqwest::Client, config: Arc<PrivilegedConfig>) -> Self {
        Self { http, config }
    }

    /// Fetch an application token and wrap it in a single-use client.
    pub async fn privileged_client(&self) -> Result<PrivilegedClient> {
        let token = client_credentials(&self.http, &self.config).await?;
        Ok(PrivilegedClient {
            http: self.http.clone(),
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OAuthConfig, build_http_client};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_user_client_sends_session_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/info"))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let factory = ClientFactory::new(build_http_client(false).unwrap());
        let client = factory.user_client(OAuthToken {
            access_token: "user-token".to_string(),
            token_type: "bearer".to_string(),
            refresh_token: None,
            expiry: None,
        });
        assert_eq!(client.identity(), "user");

        let url = Url::parse(&format!("{}/v2/info", server.uri())).unwrap();
        let response = client.get(url).send().await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_privileged_client_uses_app_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "app-token",
                "expires_in": 300
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/users/u-1"))
            .and(header("authorization", "Bearer app-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let oauth = OAuthConfig::for_console("id", "secret", "h", "l", &server.uri());
        let factory = PrivilegedClientFactory::new(
            build_http_client(false).unwrap(),
            Arc::new(PrivilegedConfig::from_oauth(&oauth)),
        );
        let client = factory.privileged_client().await.unwrap();
        assert_eq!(client.identity(), "privileged");

        let url = Url::parse(&format!("{}/v2/users/u-1", server.uri())).unwrap();
        assert_eq!(client.get(url).send().await.unwrap().status(), 200);
    }

    #[tokio::test]
    async fn test_privileged_client_fails_without_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let oauth = OAuthConfig::for_console("id", "secret", "h", "l", &server.uri());
        let factory = PrivilegedClientFactory::new(
            build_http_client(false).unwrap(),
            Arc::new(PrivilegedConfig::from_oauth(&oauth)),
        );
        assert!(factory.privileged_client().await.is_err());
    }
}
