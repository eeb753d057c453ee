//! `/uaa` identity routes.

use axum::{
    Extension, Json,
    extract::{Query, Request, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use stratus_oauth::{generic_failure, relay, upstream_url};
use tracing::{error, warn};

use crate::auth::AuthContext;
use crate::directory::{DirectoryError, is_valid_guid};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UaaInfoQuery {
    #[serde(default)]
    pub uaa_guid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    pub email: String,
}

/// The signed-in user's identity claims.
pub async fn user_info(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    request: Request,
) -> Response {
    let target = match upstream_url(&state.config.uaa_url, "/userinfo") {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "Invalid upstream target");
            return generic_failure();
        }
    };
    let client = state.clients.user_client(auth.token);
    state.proxy.forward(request, target, &client, relay).await
}

/// Another user's identity record, read with application credentials.
pub async fn uaa_info(
    State(state): State<AppState>,
    Query(query): Query<UaaInfoQuery>,
    request: Request,
) -> Response {
    let Some(guid) = query.uaa_guid.filter(|g| is_valid_guid(g)) else {
        return state.errors.bad_request();
    };
    state.directory.forward_user(request, &guid).await
}

/// Invite an email address to the platform.
pub async fn invite_users(
    State(state): State<AppState>,
    body: Result<Json<InviteRequest>, JsonRejection>,
) -> Response {
    let invite = match body {
        Ok(Json(invite)) => invite,
        Err(e) => return state.errors.bad_request_with_error(&e),
    };
    match state.directory.invite(invite.email.trim()).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e @ DirectoryError::InvalidEmail) => {
            warn!("Rejected invitation without a valid email");
            state.errors.bad_request_with_error(&e)
        }
        Err(e) => state.errors.handle_error(&e),
    }
}
