use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use checkmoyan_core::{entitlements::Entitlements, plan::Plan};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct PlanQuery {
    pub email: Option<String>,
}

/// `GET /api/plan?email=`: stored plan, effective plan and today's usage.
///
/// Without an email the caller is anonymous: free plan, shared usage bucket,
/// and no user row is created.
#[tracing::instrument(skip(state))]
pub async fn get_plan(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlanQuery>,
) -> Result<impl IntoResponse, AppError> {
    let ent = &state.entitlements;
    let now = Utc::now();
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    let (plan, premium_until, effective) = match email {
        Some(email) => {
            let stored = ent.resolve_plan(email).await?;
            let effective = stored.effective_plan(Entitlements::expiry_day(now));
            (stored.plan, stored.premium_until, effective)
        }
        None => (Plan::Free, None, Plan::Free),
    };
    let daily_limit = ent.limits().for_plan(effective);
    let used_today = ent.usage_today_at(email, now).await?;

    Ok(Json(json!({
        "data": {
            "email": email,
            "plan": plan,
            "premium_until": premium_until,
            "effective_plan": effective,
            "daily_limit": daily_limit,
            "used_today": used_today,
            "remaining_today": daily_limit.saturating_sub(used_today),
        }
    })))
}
