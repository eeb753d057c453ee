//! Upstream response handlers.

use std::future::Future;

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Body returned to the caller whenever the upstream exchange fails.
pub const GENERIC_FAILURE_BODY: &str = "unknown error. try again";

/// Turns the raw upstream response into the client-facing response.
pub trait ResponseHandler: Send {
    fn handle(self, upstream: reqwest::Response) -> impl Future<Output = Response> + Send;
}

impl<F, Fut> ResponseHandler for F
where
    F: FnOnce(reqwest::Response) -> Fut + Send,
    Fut: Future<Output = Response> + Send,
{
    fn handle(self, upstream: reqwest::Response) -> impl Future<Output = Response> + Send {
        self(upstream)
    }
}

/// Copy the upstream status and body to the caller unchanged.
pub async fn relay(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();

    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Failed to read upstream response body");
            return generic_failure();
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    response
}

/// The fixed 500 response for transport failures.
pub fn generic_failure() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE_BODY).into_response()
}
