//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use reqwest::{Client, Response, redirect};
use stratus_server::{AppState, ConsoleConfig, Server, SessionBackend, TracingMailer};
use stratus_session::{FileStore, SessionConfig, SharedSessionStore};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use wiremock::MockServer;

pub const SESSION_KEY: &str = "integration-session-key";
pub const USER_EMAIL: &str = "operator@example.gov";

/// A console running in the background against fake UAA and API servers.
pub struct TestConsole {
    pub addr: SocketAddr,
    /// Client that never follows redirects.
    pub client: Client,
    pub uaa: MockServer,
    pub api: MockServer,
    _handle: JoinHandle<()>,
    /// Session files live here.
    pub session_dir: TempDir,
}

impl TestConsole {
    pub async fn start() -> Result<Self> {
        Self::start_with(|config| config).await
    }

    /// Start with a config tweak applied on top of the defaults.
    pub async fn start_with(tweak: impl FnOnce(ConsoleConfig) -> ConsoleConfig) -> Result<Self> {
        let uaa = MockServer::start().await;
        let api = MockServer::start().await;
        let session_dir = TempDir::new()?;
        let addr = find_available_port().await?;

        let config = tweak(
            ConsoleConfig {
                hostname: format!("http://{}", addr),
                login_url: "https://login.example.com".to_string(),
                uaa_url: uaa.uri(),
                api_url: api.uri(),
                client_id: "console".to_string(),
                client_secret: "secret".to_string(),
                session_key: Some(SESSION_KEY.to_string()),
                session_dir: Some(session_dir.path().to_path_buf()),
                secure_cookies: false,
                local_cf: true,
                ..Default::default()
            }
            .with_bind_address(addr)
            .with_session_backend(SessionBackend::File),
        );
        config.validate()?;

        let store: SharedSessionStore = Arc::new(FileStore::new(
            session_dir.path(),
            SESSION_KEY.as_bytes(),
            SessionConfig::default().with_secure(false),
        )?);
        let state = AppState::new(config, store, Arc::new(TracingMailer))?;

        let server = Server::new(state);
        let handle = tokio::spawn(async move {
            let _ = server.run().await;
        });

        let client = Client::builder().redirect(redirect::Policy::none()).build()?;
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            uaa,
            api,
            _handle: handle,
            session_dir,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// GET `path`, presenting `cookie` when given.
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Result<Response> {
        let mut request = self.client.get(format!("{}{}", self.base_url(), path));
        if let Some(cookie) = cookie {
            request = request.header("cookie", cookie);
        }
        Ok(request.send().await?)
    }
}

/// A user access token whose claims carry [`USER_EMAIL`].
pub fn user_jwt() -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"email":"{}"}}"#, USER_EMAIL));
    format!("{}.{}.sig", header, claims)
}

/// The `name=value` pair of a response's session cookie.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/ping", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
