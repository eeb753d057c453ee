//! Identity-provider user lookups and invitations.
//!
//! Both need application credentials, so this is the only place besides the
//! [`AssociationNotifier`](crate::notify::AssociationNotifier) that holds a
//! [`PrivilegedClientFactory`].

use std::sync::Arc;

use axum::extract::Request;
use axum::response::Response;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use stratus_oauth::{
    AuthorizedClient, OAuthError, PrivilegedClient, PrivilegedClientFactory, ReverseProxy,
    generic_failure, relay, upstream_url,
};
use tracing::{error, info};
use url::Url;

use crate::notify::{AssociationTemplates, NotifyError, SharedMailer, UserInvitation};

/// Cloud controller error code for "a user with this UAA id already exists".
const USER_EXISTS_ERROR: &str = "CF-UaaIdTaken";

/// Directory failures.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("invalid email address")]
    InvalidEmail,

    #[error("directory request failed: {0}")]
    Upstream(#[from] OAuthError),

    #[error("invitation for {email} was refused: {reason}")]
    Refused { email: String, reason: String },

    #[error("invitation email failed: {0}")]
    Notify(#[from] NotifyError),
}

/// Outcome of an invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteOutcome {
    pub status: &'static str,
    pub email: String,
    pub user_guid: String,
    /// The identity provider had no account for this address.
    pub is_new_user: bool,
}

#[derive(Debug, Deserialize)]
struct ScimUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ScimUsers {
    #[serde(default)]
    resources: Vec<ScimUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewInvite {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    invite_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InviteResponse {
    #[serde(default)]
    new_invites: Vec<NewInvite>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    error_code: String,
}

/// Privileged view of the identity provider's user directory.
#[derive(Debug)]
pub struct UserDirectory {
    uaa_url: String,
    api_url: String,
    app_url: String,
    privileged: PrivilegedClientFactory,
    proxy: ReverseProxy,
    mailer: SharedMailer,
    templates: Arc<AssociationTemplates>,
}

impl UserDirectory {
    pub fn new(
        uaa_url: String,
        api_url: String,
        app_url: String,
        privileged: PrivilegedClientFactory,
        proxy: ReverseProxy,
        mailer: SharedMailer,
        templates: AssociationTemplates,
    ) -> Self {
        Self {
            uaa_url,
            api_url,
            app_url: app_url.trim_end_matches('/').to_string(),
            privileged,
            proxy,
            mailer,
            templates: Arc::new(templates),
        }
    }

    /// Relay the identity provider's record for `guid`.
    ///
    /// The caller must have checked `guid` with [`is_valid_guid`].
    pub async fn forward_user(&self, request: Request, guid: &str) -> Response {
        let target = match upstream_url(&self.uaa_url, &format!("/Users/{}", guid)) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "Invalid upstream target");
                return generic_failure();
            }
        };
        let client = match self.privileged.privileged_client().await {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "Could not obtain application credentials");
                return generic_failure();
            }
        };
        self.proxy.forward(request, target, &client, relay).await
    }

    /// Make sure `email` has an account on the platform.
    ///
    /// Unknown addresses are invited through the identity provider and sent
    /// the invitation link. Either way the user is then registered with the
    /// control plane.
    pub async fn invite(&self, email: &str) -> Result<InviteOutcome, DirectoryError> {
        if !is_plausible_email(email) {
            return Err(DirectoryError::InvalidEmail);
        }
        let client = self.privileged.privileged_client().await?;

        let (user_guid, is_new_user) = match self.find_by_email(&client, email).await? {
            Some(guid) => (guid, false),
            None => (self.invite_new(&client, email).await?, true),
        };
        self.register_with_api(&client, &user_guid).await?;

        info!(user_guid = %user_guid, is_new_user, "User invited");
        Ok(InviteOutcome {
            status: "success",
            email: email.to_string(),
            user_guid,
            is_new_user,
        })
    }

    async fn find_by_email(
        &self,
        client: &PrivilegedClient,
        email: &str,
    ) -> Result<Option<String>, DirectoryError> {
        let mut url = self.uaa("/Users")?;
        url.query_pairs_mut()
            .append_pair("filter", &format!("email eq \"{}\"", email));

        let response = client.get(url).send().await.map_err(OAuthError::from)?;
        let users: ScimUsers = read_json(response, "user lookup").await?;
        Ok(users.resources.into_iter().next().map(|u| u.id))
    }

    async fn invite_new(&self, client: &PrivilegedClient, email: &str) -> Result<String, DirectoryError> {
        let mut url = self.uaa("/invite_users")?;
        url.query_pairs_mut().append_pair("redirect_uri", &self.app_url);

        let response = client
            .request(Method::POST, url)
            .json(&serde_json::json!({ "emails": [email] }))
            .send()
            .await
            .map_err(OAuthError::from)?;
        let invites: InviteResponse = read_json(response, "invitation").await?;

        let refused = |reason: &str| DirectoryError::Refused {
            email: email.to_string(),
            reason: reason.to_string(),
        };
        let invite = invites
            .new_invites
            .into_iter()
            .next()
            .ok_or_else(|| refused("no invitation returned"))?;
        if !invite.success {
            return Err(refused(
                invite.error_message.as_deref().unwrap_or("unknown error"),
            ));
        }
        let user_guid = invite.user_id.ok_or_else(|| refused("no user id returned"))?;
        let invite_link = invite
            .invite_link
            .ok_or_else(|| refused("no invitation link returned"))?;

        let message = self.templates.render_invite(&UserInvitation {
            email: email.to_string(),
            invite_link,
        });
        self.mailer
            .send_email(email, &message.subject, &message.html)
            .await?;
        Ok(user_guid)
    }

    /// Create the control-plane user; an existing one is fine.
    async fn register_with_api(&self, client: &PrivilegedClient, guid: &str) -> Result<(), DirectoryError> {
        let url = upstream_url(&self.api_url, "/v2/users")?;
        let response = client
            .request(Method::POST, url)
            .json(&serde_json::json!({ "guid": guid }))
            .send()
            .await
            .map_err(OAuthError::from)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::BAD_REQUEST {
            let body: ApiError = response
                .json()
                .await
                .unwrap_or(ApiError { error_code: String::new() });
            if body.error_code == USER_EXISTS_ERROR {
                return Ok(());
            }
        }
        Err(OAuthError::Backend(format!("POST /v2/users returned {}", status)).into())
    }

    fn uaa(&self, path: &str) -> Result<Url, DirectoryError> {
        Ok(upstream_url(&self.uaa_url, path)?)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, DirectoryError> {
    let status = response.status();
    if !status.is_success() {
        return Err(OAuthError::Backend(format!("{} returned {}", what, status)).into());
    }
    response
        .json()
        .await
        .map_err(|e| OAuthError::Serialization(format!("{}: {}", what, e)).into())
}

/// Identity-provider ids: letters, digits and dashes.
pub fn is_valid_guid(guid: &str) -> bool {
    !guid.is_empty() && guid.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// `local@domain.tld` with no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}
