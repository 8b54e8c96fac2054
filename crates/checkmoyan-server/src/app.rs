use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Admin routes take an [`crate::auth::AdminSession`] argument, so every admin
/// request is authenticated on its own.
pub fn build_app(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/api/admin/upgrades", get(routes::admin::list_upgrades))
        .route("/api/admin/upgrades/{id}", get(routes::admin::get_upgrade))
        .route(
            "/api/admin/upgrades/{id}/approve",
            post(routes::admin::approve_upgrade),
        )
        .route(
            "/api/admin/upgrades/{id}/reject",
            post(routes::admin::reject_upgrade),
        )
        .route("/api/admin/users", get(routes::admin::list_users))
        .route(
            "/api/admin/users/{email}/plan",
            put(routes::admin::set_user_plan),
        )
        .route("/api/admin/stats", get(routes::admin::stats));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/pricing", get(routes::pricing::pricing))
        .route("/api/plan", get(routes::plan::get_plan))
        .route("/api/checks/quota", post(routes::checks::check_quota))
        .route("/api/checks", post(routes::checks::record_check))
        .route("/api/upgrades", post(routes::upgrades::submit_upgrade))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
