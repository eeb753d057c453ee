//! Login-required middleware.
//!
//! Resolves the caller's session and a usable token before any protected
//! handler runs. Callers without one get the same 401 whatever the reason.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Cookie;
use stratus_oauth::OAuthToken;
use stratus_session::Session;
use tracing::{debug, error};

use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Authenticated context
// ─────────────────────────────────────────────────────────────────────────────

/// What protected handlers get from the middleware, via request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session: Session,
    pub token: OAuthToken,
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

/// `401 {"status": "unauthorized"}` with caching disabled.
pub fn unauthorized_response() -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "status": "unauthorized" })),
    )
        .into_response();
    set_no_cache(&mut response);
    response
}

/// Disable caching of a response.
pub fn set_no_cache(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate, private"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("-1"));
}

/// Append a `Set-Cookie` header.
pub fn append_cookie(response: &mut Response, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => error!(error = %e, "Session cookie is not a valid header value"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Require a valid (possibly just refreshed) token.
///
/// Inserts an [`AuthContext`] for handlers and forwards any refreshed
/// session cookie onto the response.
pub async fn login_required(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match state.store.get(request.headers()).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            debug!(path = %request.uri().path(), "No session");
            return unauthorized_response();
        }
        Err(e) => return state.errors.handle_error(&e),
    };

    let mut session = session;
    let Some(valid) = state.tokens.get_valid_token(&mut session).await else {
        debug!(path = %request.uri().path(), "No valid token");
        return unauthorized_response();
    };

    request.extensions_mut().insert(AuthContext {
        session,
        token: valid.token,
    });

    let mut response = next.run(request).await;
    set_no_cache(&mut response);
    if let Some(cookie) = valid.cookie {
        append_cookie(&mut response, &cookie);
    }
    response
}
