//! HTTP server for the Stratus console.
//!
//! Serves the login flow and proxies signed-in users' calls to the
//! control-plane API and the UAA.
//!
//! # Routes
//!
//! - `GET /ping`: liveness and session store health
//! - `GET /handshake`, `GET /oauth2callback`, `GET /logout`: login flow
//! - `/v2/*`: control-plane API as the signed-in user (login required)
//! - `GET /uaa/userinfo`: identity claims (login required)
//! - `GET /uaa/uaainfo`, `POST /uaa/invite/users`: directory lookups and
//!   invitations with application credentials (login required)
//! - `GET /log/recent`: recent application logs, when a log service is configured
//!
//! # Example
//!
//! ```ignore
//! use stratus_server::{AppState, ConsoleConfig, Server, TracingMailer};
//!
//! let state = AppState::new(config, store, Arc::new(TracingMailer))?;
//! Server::new(state).run().await?;
//! ```

pub mod auth;
pub mod config;
pub mod controlplane;
pub mod directory;
pub mod error;
pub mod notify;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;

pub use auth::{AuthContext, login_required, unauthorized_response};
pub use config::{ConfigError, ConsoleConfig, SessionBackend};
pub use directory::{DirectoryError, InviteOutcome, UserDirectory};
pub use error::{ErrorEnvelope, ErrorWriter, Result, ServerError};
pub use notify::{AssociationNotifier, AssociationTemplates, Mailer, SharedMailer, TracingMailer};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// The Stratus HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .route("/handshake", get(routes::handshake))
            .route("/oauth2callback", get(routes::oauth_callback))
            .route("/logout", get(routes::logout))
            .merge(self.secured_routes())
            .layer(TimeoutLayer::new(self.state.config.request_timeout))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Routes that need a signed-in user.
    fn secured_routes(&self) -> Router<AppState> {
        let proxy = || {
            get(routes::api_proxy)
                .put(routes::api_proxy)
                .post(routes::api_proxy)
                .delete(routes::api_proxy)
        };

        let mut router = Router::new()
            .route("/v2/authstatus", get(routes::auth_status))
            .route("/v2/profile", get(routes::profile))
            .route(
                "/v2/organizations/{org_id}/users/{user_id}",
                put(routes::put_org_user).fallback(routes::api_proxy),
            )
            .route(
                "/v2/spaces/{space_id}/auditors/{user_id}",
                put(routes::put_space_auditor).fallback(routes::api_proxy),
            )
            .route("/v2/{*path}", proxy())
            .route("/uaa/userinfo", get(routes::user_info))
            .route("/uaa/uaainfo", get(routes::uaa_info))
            .route("/uaa/invite/users", post(routes::invite_users));
        if self.state.config.log_url.is_some() {
            router = router.route("/log/recent", get(routes::recent_logs));
        }

        router.route_layer(middleware::from_fn_with_state(
            self.state.clone(),
            auth::login_required,
        ))
    }

    /// Run the server until the process stops.
    pub async fn run(self) -> Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let addr = self.state.config.bind_address;
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;
        info!(addr = %addr, store = self.state.store.kind(), "Starting server");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}
