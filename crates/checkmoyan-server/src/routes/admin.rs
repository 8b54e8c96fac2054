use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use checkmoyan_core::{
    plan::{parse_plan_date, Plan},
    upgrade::{UpgradeRequest, UpgradeStatus},
};

use crate::{auth::AdminSession, error::AppError, state::AppState};

const TRENDING_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct ListUpgradesQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApproveBody {
    pub approved_until: Option<String>,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RejectBody {
    pub admin_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetPlanBody {
    pub plan: String,
    #[serde(default)]
    pub premium_until: Option<String>,
}

/// Admin-entered dates must be `YYYY-MM-DD`; blank means "no expiry".
fn validate_date(field: &str, value: Option<&str>) -> Result<(), AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(()),
        Some(raw) if parse_plan_date(raw).is_some() => Ok(()),
        Some(raw) => Err(AppError::BadRequest(format!(
            "{field} must be a YYYY-MM-DD date, got {raw:?}"
        ))),
    }
}

/// Load a request and refuse to decide it twice.
async fn pending_request(state: &AppState, id: i64) -> Result<UpgradeRequest, AppError> {
    let request = state.entitlements.get_upgrade(id).await?;
    if request.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Upgrade request {id} is already {}",
            request.status
        )));
    }
    Ok(request)
}

/// `GET /api/admin/upgrades?status=`: review queue, newest first.
#[tracing::instrument(skip(state, _admin))]
pub async fn list_upgrades(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Query(query): Query<ListUpgradesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(raw.parse::<UpgradeStatus>()?),
    };
    let requests = state.entitlements.list_upgrades(status).await?;
    Ok(Json(json!({ "data": requests })))
}

/// `GET /api/admin/upgrades/{id}`
#[tracing::instrument(skip(state, _admin))]
pub async fn get_upgrade(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.entitlements.get_upgrade(id).await?;
    Ok(Json(json!({ "data": request })))
}

/// `POST /api/admin/upgrades/{id}/approve`: approve and grant the plan.
#[tracing::instrument(skip(state, _admin, body))]
pub async fn approve_upgrade(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(id): Path<i64>,
    Json(body): Json<ApproveBody>,
) -> Result<impl IntoResponse, AppError> {
    validate_date("approved_until", body.approved_until.as_deref())?;
    pending_request(&state, id).await?;
    state
        .entitlements
        .approve_upgrade(id, body.approved_until.as_deref(), body.admin_notes.as_deref())
        .await?;
    let request = state.entitlements.get_upgrade(id).await?;
    Ok(Json(json!({ "data": request })))
}

/// `POST /api/admin/upgrades/{id}/reject`
#[tracing::instrument(skip(state, _admin, body))]
pub async fn reject_upgrade(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(id): Path<i64>,
    Json(body): Json<RejectBody>,
) -> Result<impl IntoResponse, AppError> {
    pending_request(&state, id).await?;
    state
        .entitlements
        .reject_upgrade(id, body.admin_notes.as_deref())
        .await?;
    let request = state.entitlements.get_upgrade(id).await?;
    Ok(Json(json!({ "data": request })))
}

/// `GET /api/admin/users`: newest users first.
///
/// `plan` is the stored value; a lapsed grant still shows its paid tier.
#[tracing::instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let users = state.entitlements.list_users(limit).await?;
    Ok(Json(json!({ "data": users })))
}

/// `PUT /api/admin/users/{email}/plan`: set plan and expiry directly.
#[tracing::instrument(skip(state, _admin, body))]
pub async fn set_user_plan(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(email): Path<String>,
    Json(body): Json<SetPlanBody>,
) -> Result<impl IntoResponse, AppError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::BadRequest("email is required".to_string()));
    }
    let plan: Plan = body.plan.parse()?;
    validate_date("premium_until", body.premium_until.as_deref())?;

    let ent = &state.entitlements;
    ent.set_plan(email, plan, body.premium_until.as_deref())
        .await?;
    let stored = ent.resolve_plan(email).await?;
    Ok(Json(json!({
        "data": {
            "email": email,
            "plan": stored.plan,
            "premium_until": stored.premium_until,
        }
    })))
}

/// `GET /api/admin/stats`: all-time totals plus today's volume and top categories.
#[tracing::instrument(skip(state, _admin))]
pub async fn stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
) -> Result<impl IntoResponse, AppError> {
    let ent = &state.entitlements;
    let totals = ent.totals().await?;
    let today = ent.stats_today().await?;
    let trending = ent.trending_today(TRENDING_LIMIT).await?;
    Ok(Json(json!({
        "data": {
            "totals": totals,
            "today": today,
            "trending_categories": trending,
        }
    })))
}
