use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::{auth::password::verify_password, error::AppError, state::AppState};

/// Header carrying the shared admin password.
pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// Proof that the current request presented the admin password.
///
/// Taking `AdminSession` as a handler argument is the only way to reach the
/// admin workflow; nothing is remembered between requests.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession;

impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(hash) = state.admin_password_hash() else {
            return Err(AppError::AdminDisabled);
        };
        let Some(presented) = parts
            .headers
            .get(ADMIN_PASSWORD_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
        else {
            return Err(AppError::Unauthorized);
        };

        // Argon2 verification is CPU-bound; keep it off the async workers.
        let hash = hash.to_string();
        let ok = tokio::task::spawn_blocking(move || verify_password(&presented, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        if ok {
            Ok(AdminSession)
        } else {
            warn!("Rejected admin request with wrong password");
            Err(AppError::Unauthorized)
        }
    }
}
