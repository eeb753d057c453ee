//! OAuth2 credentials and the authenticated reverse proxy for Stratus.
//!
//! # Components
//!
//! - [`oauth`]: authorization URL, code exchange, refresh and client-credentials grants
//! - [`token_manager`]: per-session token validation and refresh-and-persist
//! - [`client`]: user and privileged credential clients
//! - [`proxy`]: forwards inbound requests upstream with trust headers
//! - [`relay`]: response handlers, including the verbatim relay

pub mod client;
pub mod client_ip;
pub mod config;
pub mod error;
pub mod oauth;
pub mod proxy;
pub mod relay;
pub mod token;
pub mod token_manager;

pub use client::{AuthorizedClient, ClientFactory, PrivilegedClient, PrivilegedClientFactory, UserClient};
pub use client_ip::{client_ip_header, resolve_client_ip};
pub use config::{OAuthConfig, PrivilegedConfig, REQUEST_TIMEOUT, build_http_client};
pub use error::{OAuthError, Result};
pub use oauth::{build_authorization_url, generate_state};
pub use proxy::{ProxyConfig, ReverseProxy, upstream_url};
pub use relay::{GENERIC_FAILURE_BODY, ResponseHandler, generic_failure, relay};
pub use token::OAuthToken;
pub use token_manager::{SharedTokenManager, TOKEN_KEY, TokenManager, ValidToken};
