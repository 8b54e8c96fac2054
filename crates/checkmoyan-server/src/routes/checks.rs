use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use checkmoyan_core::{fingerprint::fingerprint, scan::ScanOutcome};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct QuotaRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Result of one scan, reported by the scanning front end.
///
/// The raw `content` is only hashed here and never stored.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub email: Option<String>,
    pub verdict: String,
    pub confidence: i32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub signals: Option<Vec<String>>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_fingerprint: Option<String>,
}

fn caller(email: &Option<String>) -> Option<&str> {
    email.as_deref().map(str::trim).filter(|e| !e.is_empty())
}

/// `POST /api/checks/quota`: may this caller run another check today?
#[tracing::instrument(skip(state, req))]
pub async fn check_quota(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuotaRequest>,
) -> Result<impl IntoResponse, AppError> {
    let decision = state.entitlements.can_check(caller(&req.email)).await?;
    Ok(Json(json!({ "data": decision })))
}

/// `POST /api/checks`: gate on the quota, then count the check and store its outcome.
///
/// Denied callers get `429` with the quota message and nothing is recorded.
#[tracing::instrument(skip(state, req))]
pub async fn record_check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> Result<impl IntoResponse, AppError> {
    let verdict = req.verdict.trim();
    if verdict.is_empty() {
        return Err(AppError::BadRequest("verdict is required".to_string()));
    }
    if !(0..=100).contains(&req.confidence) {
        return Err(AppError::BadRequest(
            "confidence must be between 0 and 100".to_string(),
        ));
    }

    let ent = &state.entitlements;
    let email = caller(&req.email);
    let now = Utc::now();

    let decision = ent.can_check_at(email, now).await?;
    if !decision.allowed {
        return Err(AppError::QuotaExceeded(decision.reason));
    }

    let content_fingerprint = req
        .content_fingerprint
        .filter(|f| !f.trim().is_empty())
        .or_else(|| req.content.as_deref().map(fingerprint));
    let outcome = ScanOutcome {
        verdict: verdict.to_string(),
        confidence: req.confidence,
        category: req.category.filter(|c| !c.trim().is_empty()),
        signals: req.signals,
        content_fingerprint,
    };
    let scan_id = ent.record_check_at(email, &outcome, now).await?;

    let used = decision.used.saturating_add(1);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "data": {
                "scan_id": scan_id,
                "used": used,
                "limit": decision.limit,
                "remaining": decision.limit.saturating_sub(used),
            }
        })),
    ))
}
