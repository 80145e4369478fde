use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::mail::templates;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by JSON handlers. The body is always `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// Logged in full, reported to the client with a fixed message.
    #[error("internal error: {source:#}")]
    Internal {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Internal { message, .. } => (*message).to_string(),
            other => other.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(source: anyhow::Error) -> Self {
        Self::Internal {
            message: "Internal server error",
            source,
        }
    }
}

/// Attach a client-facing message to an internal failure.
pub trait InternalContext<T> {
    fn or_internal(self, message: &'static str) -> ApiResult<T>;
}

impl<T> InternalContext<T> for anyhow::Result<T> {
    fn or_internal(self, message: &'static str) -> ApiResult<T> {
        self.map_err(|source| ApiError::Internal { message, source })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal { source, .. } = &self {
            error!(error = %format!("{:#}", source), "request failed");
        }
        let status = self.status();
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Error for routes that answer browsers with HTML pages.
#[derive(Debug)]
pub struct HtmlError {
    pub status: StatusCode,
    pub heading: &'static str,
}

impl HtmlError {
    pub fn bad_request(heading: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            heading,
        }
    }

    pub fn internal(heading: &'static str, source: anyhow::Error) -> Self {
        error!(error = %format!("{:#}", source), "html request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            heading,
        }
    }
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        (self.status, Html(templates::page(self.heading, None))).into_response()
    }
}
