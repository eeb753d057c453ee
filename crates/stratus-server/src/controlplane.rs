//! Typed lookups against the control-plane API (v2 resource format).

use serde::Deserialize;
use serde::de::DeserializeOwned;
use stratus_oauth::{AuthorizedClient, OAuthError, PrivilegedClient, UserClient, upstream_url};

/// Resource metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub guid: String,
}

/// `{"metadata": {...}, "entity": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct Resource<T> {
    pub metadata: Metadata,
    pub entity: T,
}

#[derive(Debug, Clone, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    resources: Vec<Resource<T>>,
    #[serde(default)]
    next_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Organization {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Space {
    pub name: String,
    pub organization_guid: String,
}

/// Control-plane API reader.
#[derive(Debug, Clone)]
pub struct ControlPlane {
    base_url: String,
}

impl ControlPlane {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Look up any user. Needs application credentials.
    pub async fn user(&self, client: &PrivilegedClient, id: &str) -> Result<Resource<User>, OAuthError> {
        self.fetch(client, &format!("/v2/users/{}", id)).await
    }

    pub async fn organization(
        &self,
        client: &UserClient,
        id: &str,
    ) -> Result<Resource<Organization>, OAuthError> {
        self.fetch(client, &format!("/v2/organizations/{}", id)).await
    }

    pub async fn organization_managers(
        &self,
        client: &UserClient,
        id: &str,
    ) -> Result<Vec<Resource<User>>, OAuthError> {
        self.fetch_all(client, &format!("/v2/organizations/{}/managers", id))
            .await
    }

    pub async fn space(&self, client: &UserClient, id: &str) -> Result<Resource<Space>, OAuthError> {
        self.fetch(client, &format!("/v2/spaces/{}", id)).await
    }

    pub async fn space_managers(
        &self,
        client: &UserClient,
        id: &str,
    ) -> Result<Vec<Resource<User>>, OAuthError> {
        self.fetch_all(client, &format!("/v2/spaces/{}/managers", id))
            .await
    }

    async fn fetch<C, T>(&self, client: &C, path: &str) -> Result<T, OAuthError>
    where
        C: AuthorizedClient,
        T: DeserializeOwned,
    {
        let url = upstream_url(&self.base_url, path)?;
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OAuthError::Backend(format!(
                "GET {} returned {}",
                path, status
            )));
        }
        response
            .json()
            .await
            .map_err(|e| OAuthError::Serialization(format!("GET {}: {}", path, e)))
    }

    /// Follow `next_url` until the listing is exhausted.
    async fn fetch_all<C, T>(&self, client: &C, path: &str) -> Result<Vec<Resource<T>>, OAuthError>
    where
        C: AuthorizedClient,
        T: DeserializeOwned,
    {
        let mut resources = Vec::new();
        let mut next = Some(path.to_string());
        while let Some(path) = next.take() {
            let page: Page<T> = self.fetch(client, &path).await?;
            resources.extend(page.resources);
            next = page.next_url.filter(|n| !n.is_empty());
        }
        Ok(resources)
    }
}
