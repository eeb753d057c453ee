//! Error types and the JSON error envelope.
//!
//! Clients only ever see a fixed code and message; the underlying error is
//! logged and never serialized.

use std::backtrace::Backtrace;

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::unauthorized_response;
use crate::notify::NotifyError;

/// Body sent if an envelope cannot be serialized.
pub const FALLBACK_BODY: &str =
    r#"{"error":{"code":"internalServerError","message":"Internal server error."}}"#;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Code and optional message shown to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
    /// Internal-only description of the original error.
    #[serde(skip)]
    source: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: Some(message.into()),
            },
            source: None,
        }
    }

    pub fn bad_request() -> Self {
        Self::new("badRequest", "Bad request.")
    }

    pub fn internal_server_error() -> Self {
        Self::new("internalServerError", "Internal server error.")
    }

    /// Attach the original error for logging.
    pub fn with_source(mut self, err: &dyn std::fmt::Display) -> Self {
        self.source = Some(err.to_string());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Writer
// ─────────────────────────────────────────────────────────────────────────────

/// Renders error envelopes as responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorWriter;

impl ErrorWriter {
    /// Any unexpected failure: logged with a backtrace, generic 500 to the client.
    pub fn handle_error(&self, err: &dyn std::error::Error) -> Response {
        error!(error = %err, "Request failed");
        error!("{}", Backtrace::force_capture());
        self.write(
            StatusCode::INTERNAL_SERVER_ERROR,
            &ErrorEnvelope::internal_server_error().with_source(&err),
        )
    }

    pub fn bad_request(&self) -> Response {
        self.write(StatusCode::BAD_REQUEST, &ErrorEnvelope::bad_request())
    }

    /// 400 with the cause logged but not shown.
    pub fn bad_request_with_error(&self, err: &dyn std::error::Error) -> Response {
        self.write(
            StatusCode::BAD_REQUEST,
            &ErrorEnvelope::bad_request().with_source(&err),
        )
    }

    /// Arbitrary status with a caller-built envelope.
    pub fn write(&self, status: StatusCode, envelope: &ErrorEnvelope) -> Response {
        if let Some(source) = envelope.source() {
            warn!(status = %status, code = %envelope.error.code, error = %source, "Error response");
        }

        let (status, body) = match serde_json::to_vec(envelope) {
            Ok(body) => (status, Body::from(body)),
            Err(e) => {
                error!(error = %e, "Could not marshal JSON error response");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Body::from(FALLBACK_BODY),
                )
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        );
        response
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ServerError
// ─────────────────────────────────────────────────────────────────────────────

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// No usable token. Never says why.
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Identity provider or control-plane failure.
    #[error("Upstream error: {0}")]
    Upstream(#[from] stratus_oauth::OAuthError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] stratus_session::SessionError),

    /// Notification side effect failed.
    #[error("Notification error: {0}")]
    Notification(#[from] NotifyError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let writer = ErrorWriter;
        match &self {
            ServerError::Unauthorized => unauthorized_response(),
            ServerError::BadRequest(_) => writer.bad_request_with_error(&self),
            _ => writer.handle_error(&self),
        }
    }
}
