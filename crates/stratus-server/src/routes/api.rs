//! `/v2` control-plane routes.

use axum::{
    Extension, Json,
    extract::{Request, State},
    response::{IntoResponse, Response},
};
use stratus_oauth::{generic_failure, relay};
use tracing::error;

use crate::auth::AuthContext;
use crate::routes::login::found;
use crate::state::AppState;

/// Reaching this handler means the login middleware accepted the caller.
pub async fn auth_status() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "authorized" }))
}

/// Profile pages live on the login server.
pub async fn profile(State(state): State<AppState>) -> Response {
    found(&format!("{}/profile", state.config.login_url.trim_end_matches('/')))
}

/// Forward any other `/v2` call to the control-plane API as the user.
pub async fn api_proxy(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    request: Request,
) -> Response {
    let target = match state.api_url(&path_and_query(&request)) {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "Invalid upstream target");
            return generic_failure();
        }
    };
    let client = state.clients.user_client(auth.token);
    state.proxy.forward(request, target, &client, relay).await
}

pub(crate) fn path_and_query(request: &Request) -> String {
    request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}
