use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use checkmoyan_core::error::CoreError;

/// Application-level errors that map directly to HTTP responses.
///
/// Every variant implements [`IntoResponse`] so Axum handlers can use
/// `Result<impl IntoResponse, AppError>` as their return type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    /// No admin password is configured, so the admin API is off.
    #[error("admin disabled")]
    AdminDisabled,

    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller's daily check quota is used up. Carries the user-facing text.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::UpgradeRequestNotFound(id) => {
                AppError::NotFound(format!("Upgrade request {id} not found"))
            }
            CoreError::InvalidPlan(_) | CoreError::InvalidStatus(_) => {
                AppError::BadRequest(e.to_string())
            }
            CoreError::Serialization(e) => AppError::Internal(e.into()),
            CoreError::Storage(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.as_str()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.as_str())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized"),
            AppError::AdminDisabled => (
                StatusCode::FORBIDDEN,
                "admin_disabled",
                "Admin API disabled. Set CHECKMOYAN_ADMIN_PASSWORD to enable it.",
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.as_str()),
            AppError::QuotaExceeded(msg) => {
                (StatusCode::TOO_MANY_REQUESTS, "quota_exceeded", msg.as_str())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message,
                    "field": null
                }
            })),
        )
            .into_response()
    }
}
