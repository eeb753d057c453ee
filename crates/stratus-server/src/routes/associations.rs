//! Role associations that notify the people involved.
//!
//! The upstream call happens first. Only when it succeeds are the grantee
//! and managers notified, and a failed notification replaces the upstream
//! response with an error.

use axum::{
    Extension,
    extract::{Path, Request, State},
    response::Response,
};
use stratus_oauth::{UserClient, generic_failure, relay};
use tracing::error;

use crate::auth::AuthContext;
use crate::error::ServerError;
use crate::notify::NotifyError;
use crate::routes::api::path_and_query;
use crate::state::AppState;

enum Association {
    Organization { org_id: String },
    Space { space_id: String },
}

/// `PUT /v2/organizations/{org_id}/users/{user_id}`
pub async fn put_org_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, user_id)): Path<(String, String)>,
    request: Request,
) -> Response {
    associate(state, auth, Association::Organization { org_id }, user_id, request).await
}

/// `PUT /v2/spaces/{space_id}/auditors/{user_id}`
pub async fn put_space_auditor(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((space_id, user_id)): Path<(String, String)>,
    request: Request,
) -> Response {
    associate(state, auth, Association::Space { space_id }, user_id, request).await
}

async fn associate(
    state: AppState,
    auth: AuthContext,
    association: Association,
    user_id: String,
    request: Request,
) -> Response {
    let target = match state.api_url(&path_and_query(&request)) {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "Invalid upstream target");
            return generic_failure();
        }
    };
    let client = state.clients.user_client(auth.token.clone());
    let notify_as = client.clone();

    let handler_state = state.clone();
    let handler = move |upstream: reqwest::Response| async move {
        if !upstream.status().is_success() {
            return relay(upstream).await;
        }
        match notify(&handler_state, &notify_as, &auth, &association, &user_id).await {
            Ok(()) => relay(upstream).await,
            Err(e) => handler_state
                .errors
                .handle_error(&ServerError::Notification(e)),
        }
    };

    state.proxy.forward(request, target, &client, handler).await
}

async fn notify(
    state: &AppState,
    client: &UserClient,
    auth: &AuthContext,
    association: &Association,
    user_id: &str,
) -> Result<(), NotifyError> {
    let granter = auth.token.email()?;

    match association {
        Association::Organization { org_id } => {
            state
                .notifier
                .user_associated_with_org(client, &granter, org_id, user_id)
                .await
        }
        Association::Space { space_id } => {
            state
                .notifier
                .user_associated_with_space(client, &granter, space_id, user_id)
                .await
        }
    }
}
