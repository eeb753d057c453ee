//! `/log` routes backed by the log service.

use axum::{
    Extension,
    extract::{Query, Request, State},
    response::Response,
};
use serde::Deserialize;
use stratus_oauth::{generic_failure, relay, upstream_url};
use tracing::error;

use crate::auth::AuthContext;
use crate::directory::is_valid_guid;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentLogsQuery {
    #[serde(default)]
    pub app: Option<String>,
}

/// Recent log lines for one application, fetched as the signed-in user.
pub async fn recent_logs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<RecentLogsQuery>,
    request: Request,
) -> Response {
    let Some(app) = query.app.filter(|a| is_valid_guid(a)) else {
        return state.errors.bad_request();
    };
    let Some(log_url) = state.config.log_url.as_deref() else {
        error!("Log route reached without a log service configured");
        return generic_failure();
    };

    let target = match upstream_url(log_url, &format!("/recent?app={}", app)) {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "Invalid upstream target");
            return generic_failure();
        }
    };
    let client = state.clients.user_client(auth.token);
    state.proxy.forward(request, target, &client, relay).await
}
