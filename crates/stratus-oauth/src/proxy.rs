//! Authenticated reverse proxy to the control-plane API.
//!
//! Only `Content-Type` is forwarded from the inbound request. When a shared
//! secret with the internal API gateway is configured, the resolved client IP
//! and the secret are attached so the gateway can trust the traffic.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, warn};
use url::Url;

use crate::client::AuthorizedClient;
use crate::client_ip::client_ip_header;
use crate::relay::{ResponseHandler, generic_failure};

/// Header carrying the resolved caller address.
pub const CLIENT_IP_HEADER: &str = "x-client-ip";

/// Header carrying the shared gateway secret.
pub const TIC_SECRET_HEADER: &str = "x-tic-secret";

/// Largest inbound body the proxy will buffer.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Proxy settings.
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Shared secret for the trusted-gateway header pair.
    pub tic_secret: Option<String>,
}

impl ProxyConfig {
    pub fn with_tic_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.tic_secret = (!secret.is_empty()).then_some(secret);
        self
    }
}

/// Forwards inbound requests upstream with a caller-chosen credential.
#[derive(Debug, Clone, Default)]
pub struct ReverseProxy {
    config: Arc<ProxyConfig>,
}

impl ReverseProxy {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Send `inbound` to `target` as `client` and hand the result to `handler`.
    ///
    /// Transport failures never reach the handler: they are logged and the
    /// caller gets a fixed 500 response.
    pub async fn forward<C, H>(
        &self,
        inbound: Request,
        target: Url,
        client: &C,
        handler: H,
    ) -> Response
    where
        C: AuthorizedClient,
        H: ResponseHandler,
    {
        let (parts, body) = inbound.into_parts();
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        if declared_length(&parts.headers).is_some_and(|len| len > MAX_BODY_BYTES) {
            warn!(target = %target, "Rejecting inbound body over the declared size limit");
            return payload_too_large();
        }

        let body = match to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) if e.to_string().contains("length limit") => {
                warn!(target = %target, "Inbound body exceeded the size limit");
                return payload_too_large();
            }
            Err(e) => {
                error!(error = %e, "Failed to read inbound request body");
                return generic_failure();
            }
        };

        let mut outbound = client.request(parts.method.clone(), target.clone());
        if let Some(content_type) = parts.headers.get(header::CONTENT_TYPE) {
            outbound = outbound.header(header::CONTENT_TYPE, content_type.clone());
        }
        if let Some(secret) = &self.config.tic_secret {
            outbound = outbound
                .header(CLIENT_IP_HEADER, client_ip_header(&parts.headers, peer))
                .header(TIC_SECRET_HEADER, secret.as_str());
        }
        if !body.is_empty() {
            outbound = outbound.body(body);
        }

        debug!(method = %parts.method, target = %target, identity = client.identity(), "Proxying request");
        match outbound.send().await {
            Ok(upstream) => handler.handle(upstream).await,
            Err(e) => {
                error!(method = %parts.method, target = %target, error = %e, "Upstream request failed");
                generic_failure()
            }
        }
    }
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn payload_too_large() -> Response {
    (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response()
}

/// Convenience for building the upstream URL of a proxied path.
pub fn upstream_url(base: &str, path_and_query: &str) -> crate::Result<Url> {
    let raw = format!("{}{}", base.trim_end_matches('/'), path_and_query);
    Url::parse(&raw)
        .map_err(|e| crate::OAuthError::InvalidRequest(format!("Invalid upstream URL '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientFactory;
    use crate::config::build_http_client;
    use crate::relay::{GENERIC_FAILURE_BODY, relay};
    use crate::token::OAuthToken;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use wiremock::matchers::{body_string, header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_client() -> crate::UserClient {
        ClientFactory::new(build_http_client(false).unwrap()).user_client(OAuthToken {
            access_token: "user-token".to_string(),
            token_type: "bearer".to_string(),
            refresh_token: None,
            expiry: None,
        })
    }

    fn inbound(method: &str, uri: &str, body: &'static str) -> Request {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("cookie", "session=secret")
            .header("x-internal-trace", "abc")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_of(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_relay_preserves_status_and_body() {
        let server = MockServer::start().await;
        for (route, status, body) in [
            ("/ok", 200, "created"),
            ("/missing", 404, "{\"code\":10000}"),
            ("/broken", 503, "upstream down"),
        ] {
            Mock::given(path(route))
                .respond_with(ResponseTemplate::new(status).set_body_string(body))
                .mount(&server)
                .await;
        }

        let proxy = ReverseProxy::default();
        let client = user_client();
        for (route, status, body) in [
            ("/ok", 200, "created"),
            ("/missing", 404, "{\"code\":10000}"),
            ("/broken", 503, "upstream down"),
        ] {
            let target = upstream_url(&server.uri(), route).unwrap();
            let response = proxy
                .forward(inbound("GET", route, ""), target, &client, relay)
                .await;
            assert_eq!(response.status().as_u16(), status);
            assert_eq!(body_of(response).await, body.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_forwards_only_content_type_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v2/spaces/s-1"))
            .and(header_is("content-type", "application/json"))
            .and(header_is("authorization", "Bearer user-token"))
            .and(body_string("{\"name\":\"dev\"}"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let proxy = ReverseProxy::default();
        let target = upstream_url(&server.uri(), "/v2/spaces/s-1").unwrap();
        let response = proxy
            .forward(
                inbound("PUT", "/v2/spaces/s-1", "{\"name\":\"dev\"}"),
                target,
                &user_client(),
                relay,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let received = server.received_requests().await.unwrap();
        let headers = &received[0].headers;
        assert!(headers.get("cookie").is_none());
        assert!(headers.get("x-internal-trace").is_none());
        assert!(headers.get(TIC_SECRET_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_trusted_gateway_headers() {
        let server = MockServer::start().await;
        Mock::given(header_is(TIC_SECRET_HEADER, "shh"))
            .and(header_is(CLIENT_IP_HEADER, "203.0.113.5"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let proxy = ReverseProxy::new(ProxyConfig::default().with_tic_secret("shh"));
        let mut request = inbound("GET", "/v2/info", "");
        request
            .headers_mut()
            .insert("x-forwarded-for", "10.0.0.1, 203.0.113.5, 192.168.1.1".parse().unwrap());
        let peer: SocketAddr = "10.9.9.9:4000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        let target = upstream_url(&server.uri(), "/v2/info").unwrap();
        let response = proxy.forward(request, target, &user_client(), relay).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_client_ip_does_not_fail() {
        let server = MockServer::start().await;
        Mock::given(header_is(CLIENT_IP_HEADER, "unknown"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let proxy = ReverseProxy::new(ProxyConfig::default().with_tic_secret("shh"));
        let target = upstream_url(&server.uri(), "/v2/info").unwrap();
        let response = proxy
            .forward(inbound("GET", "/v2/info", ""), target, &user_client(), relay)
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_transport_failure_is_generic_500() {
        let server = MockServer::start().await;
        let target = upstream_url(&server.uri(), "/v2/info").unwrap();
        drop(server);

        let response = ReverseProxy::default()
            .forward(inbound("GET", "/v2/info", ""), target, &user_client(), relay)
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await, GENERIC_FAILURE_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_custom_handler_sees_upstream() {
        let server = MockServer::start().await;
        Mock::given(path("/v2/info"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let target = upstream_url(&server.uri(), "/v2/info").unwrap();
        let response = ReverseProxy::default()
            .forward(
                inbound("GET", "/v2/info", ""),
                target,
                &user_client(),
                |upstream: reqwest::Response| async move {
                    let text = upstream.text().await.unwrap_or_default();
                    (StatusCode::ACCEPTED, text.to_uppercase()).into_response()
                },
            )
            .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_of(response).await, b"HELLO");
    }

    #[tokio::test]
    async fn test_oversized_body_is_413_and_never_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        let proxy = ReverseProxy::default();
        let target = upstream_url(&server.uri(), "/v2/apps").unwrap();

        // Declared length over the limit.
        let mut declared = inbound("POST", "/v2/apps", "{}");
        declared
            .headers_mut()
            .insert("content-length", (MAX_BODY_BYTES + 1).to_string().parse().unwrap());
        let response = proxy
            .forward(declared, target.clone(), &user_client(), relay)
            .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        // Undeclared body that turns out too large.
        let streamed = axum::http::Request::builder()
            .method("POST")
            .uri("/v2/apps")
            .body(Body::from(vec![b'x'; MAX_BODY_BYTES + 1]))
            .unwrap();
        let response = proxy.forward(streamed, target, &user_client(), relay).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_upstream_url() {
        let url = upstream_url("https://api.example.com/", "/v2/apps?q=name:foo").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v2/apps?q=name:foo");
        assert!(upstream_url("not a base", "/x").is_err());
    }
}
