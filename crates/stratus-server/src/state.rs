//! Application state shared across handlers.

use std::sync::Arc;

use stratus_oauth::{
    ClientFactory, PrivilegedClientFactory, ReverseProxy, SharedTokenManager, TokenManager,
    build_http_client,
};
use stratus_session::SharedSessionStore;

use crate::config::ConsoleConfig;
use crate::directory::UserDirectory;
use crate::error::{Result, ServerError};
use crate::notify::{AssociationNotifier, AssociationTemplates, SharedMailer};

/// Application state shared across all handlers.
///
/// Privileged credentials are not reachable from here: only the
/// [`AssociationNotifier`] and the [`UserDirectory`] hold a
/// [`PrivilegedClientFactory`].
#[derive(Clone)]
pub struct AppState {
    /// Console configuration.
    pub config: Arc<ConsoleConfig>,

    /// Session backend.
    pub store: SharedSessionStore,

    /// Token validation and refresh.
    pub tokens: SharedTokenManager,

    /// Builds user-scoped clients.
    pub clients: ClientFactory,

    /// Authenticated reverse proxy.
    pub proxy: ReverseProxy,

    /// Error envelope writer.
    pub errors: crate::error::ErrorWriter,

    /// Association notifications.
    pub notifier: Arc<AssociationNotifier>,

    /// Privileged user lookups and invitations.
    pub directory: Arc<UserDirectory>,
}

impl AppState {
    /// Wire up every component from the configuration.
    pub fn new(
        config: ConsoleConfig,
        store: SharedSessionStore,
        mailer: SharedMailer,
    ) -> Result<Self> {
        let http = build_http_client(config.insecure_tls())?;
        let config = Arc::new(config);

        let tokens = Arc::new(TokenManager::new(
            store.clone(),
            Arc::new(config.oauth_config()),
            http.clone(),
        ));
        let privileged =
            PrivilegedClientFactory::new(http.clone(), Arc::new(config.privileged_config()));
        let proxy = ReverseProxy::new(config.proxy_config());
        let directory = UserDirectory::new(
            config.uaa_url.clone(),
            config.api_url.clone(),
            config.hostname.clone(),
            privileged.clone(),
            proxy.clone(),
            mailer.clone(),
            AssociationTemplates::default(),
        );
        let notifier = AssociationNotifier::new(
            config.api_url.clone(),
            config.hostname.clone(),
            privileged,
            mailer,
            AssociationTemplates::default(),
        );

        Ok(Self {
            proxy,
            clients: ClientFactory::new(http),
            tokens,
            store,
            errors: crate::error::ErrorWriter,
            notifier: Arc::new(notifier),
            directory: Arc::new(directory),
            config,
        })
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Upstream control-plane URL for a proxied path.
    pub fn api_url(&self, path_and_query: &str) -> Result<url::Url> {
        stratus_oauth::upstream_url(&self.config.api_url, path_and_query).map_err(ServerError::from)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store.kind())
            .finish_non_exhaustive()
    }
}
