//! Login handshake, OAuth callback and logout.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use stratus_oauth::{build_authorization_url, generate_state, oauth};
use subtle::ConstantTimeEq;
use tracing::info;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Session key holding the pending login's anti-forgery state.
pub const OAUTH_STATE_KEY: &str = "oauth_state";

/// 302 to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Start a login, or skip straight to the dashboard if already signed in.
pub async fn handshake(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let mut session = state.store.get(&headers).await?.unwrap_or_default();
    let mut jar = CookieJar::new();

    if let Some(valid) = state.tokens.get_valid_token(&mut session).await {
        if let Some(cookie) = valid.cookie {
            jar = jar.add(cookie);
        }
        return Ok((jar, found(&state.config.dashboard_url())).into_response());
    }

    let oauth_state = generate_state();
    session.insert(OAUTH_STATE_KEY, &oauth_state)?;
    jar = jar.add(state.store.put(&mut session).await?);

    let url = build_authorization_url(state.tokens.config(), &oauth_state)?;
    Ok((jar, found(url.as_str())).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Finish a login: check state, exchange the code and keep the token.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<Response> {
    let Some(mut session) = state.store.get(&headers).await? else {
        return Err(ServerError::BadRequest("callback without a session".into()));
    };

    let expected: Option<String> = session.get(OAUTH_STATE_KEY);
    let matches = match (expected.as_deref(), params.state.as_deref()) {
        (Some(expected), Some(got)) => bool::from(expected.as_bytes().ct_eq(got.as_bytes())),
        _ => false,
    };
    if !matches {
        return Err(ServerError::BadRequest("OAuth state mismatch".into()));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ServerError::BadRequest("missing authorization code".into()))?;

    let token = oauth::exchange_code(state.tokens.http(), state.tokens.config(), &code).await?;
    session.remove(OAUTH_STATE_KEY);
    let cookie = state.tokens.store_token(&mut session, &token).await?;

    info!(session_id = %session.id(), "User logged in");
    Ok((CookieJar::new().add(cookie), found(&state.config.dashboard_url())).into_response())
}

/// Destroy the session and hand over to the login server's logout page.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let session = state.store.get(&headers).await?.unwrap_or_default();
    let cookie = state.store.remove(&session).await?;

    let target = format!("{}/logout.do", state.config.login_url.trim_end_matches('/'));
    Ok((CookieJar::new().add(cookie), found(&target)).into_response())
}
