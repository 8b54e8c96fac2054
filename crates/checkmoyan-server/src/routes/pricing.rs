use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /api/pricing`: plan catalog and where to send payment.
pub async fn pricing(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let p = &state.payments;
    Json(json!({
        "data": {
            "plans": p.plans(),
            "payment_methods": {
                "gcash": { "number": p.gcash_number, "name": p.gcash_name },
                "maya": { "number": p.maya_number, "name": p.maya_name },
            },
            "limits": p.limits(),
        }
    }))
}
