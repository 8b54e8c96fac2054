use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use checkmoyan_core::{
    plan::Plan,
    upgrade::{NewUpgradeRequest, UpgradeStatus},
};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SubmitUpgradeRequest {
    pub email: String,
    pub plan: String,
    pub method: String,
    #[serde(default, rename = "ref")]
    pub payment_ref: Option<String>,
    #[serde(default)]
    pub receipt_path: Option<String>,
}

/// `POST /api/upgrades`: file a manual-payment upgrade request for review.
#[tracing::instrument(skip(state, req))]
pub async fn submit_upgrade(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitUpgradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = req.email.trim();
    let method = req.method.trim();
    if email.is_empty() {
        return Err(AppError::BadRequest("email is required".to_string()));
    }
    if method.is_empty() {
        return Err(AppError::BadRequest("method is required".to_string()));
    }
    let plan: Plan = req.plan.parse()?;
    if !plan.is_paid() {
        return Err(AppError::BadRequest(
            "plan must be premium or pro".to_string(),
        ));
    }

    let id = state
        .entitlements
        .submit_upgrade(&NewUpgradeRequest {
            email: email.to_string(),
            plan,
            method: method.to_string(),
            payment_ref: req.payment_ref,
            receipt_path: req.receipt_path,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "data": {
                "id": id,
                "status": UpgradeStatus::Pending,
            }
        })),
    ))
}
