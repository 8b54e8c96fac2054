use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use checkmoyan_core::config::{Config, StorageBackend};
use checkmoyan_core::payments::PaymentConfig;
use checkmoyan_core::plan::Plan;
use checkmoyan_core::upgrade::NewUpgradeRequest;
use checkmoyan_duckdb::DuckDbBackend;
use checkmoyan_server::app::build_app;
use checkmoyan_server::state::AppState;

const ADMIN_PASSWORD: &str = "correct-horse-battery";

fn test_config(admin_password: Option<&str>) -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/checkmoyan-test".to_string(),
        backend: StorageBackend::DuckDb,
        duckdb_memory_limit: "256MB".to_string(),
        timezone: chrono_tz::Asia::Manila,
        admin_password: admin_password.map(str::to_string),
        argon2_memory_kb: 1024,
        secrets_path: "/nonexistent/secrets.toml".to_string(),
    }
}

fn setup_with(admin_password: Option<&str>) -> (Arc<DuckDbBackend>, axum::Router) {
    let db = Arc::new(DuckDbBackend::open_in_memory().expect("in-memory DuckDB"));
    let state = AppState::new(
        db.clone(),
        test_config(admin_password),
        PaymentConfig::default(),
    )
    .expect("app state");
    (db, build_app(Arc::new(state)))
}

fn setup() -> (Arc<DuckDbBackend>, axum::Router) {
    setup_with(Some(ADMIN_PASSWORD))
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

fn admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-admin-password", ADMIN_PASSWORD);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    request.expect("build request")
}

async fn submit(db: &DuckDbBackend, email: &str, plan: Plan) -> i64 {
    db.insert_upgrade_request(&NewUpgradeRequest {
        email: email.to_string(),
        plan,
        method: "gcash".to_string(),
        payment_ref: Some("GC-1".to_string()),
        receipt_path: Some("receipts/1.png".to_string()),
    })
    .await
    .expect("submit")
}

#[tokio::test]
async fn test_admin_requires_password_header() {
    let (_, app) = setup();
    let request = Request::builder()
        .method("GET")
        .uri("/api/admin/upgrades")
        .body(Body::empty())
        .expect("build request");
    let response = app.oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_admin_rejects_wrong_password() {
    let (_, app) = setup();
    let request = Request::builder()
        .method("GET")
        .uri("/api/admin/stats")
        .header("x-admin-password", "guess")
        .body(Body::empty())
        .expect("build request");
    let response = app.oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_disabled_without_configured_password() {
    let (_, app) = setup_with(None);
    let response = app
        .oneshot(admin("GET", "/api/admin/users", None))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "admin_disabled");
}

#[tokio::test]
async fn test_approve_grants_plan_and_blocks_second_decision() {
    let (db, app) = setup();
    let id = submit(&db, "buyer@example.com", Plan::Premium).await;

    let response = app
        .clone()
        .oneshot(admin(
            "POST",
            &format!("/api/admin/upgrades/{id}/approve"),
            Some(json!({ "approved_until": "2099-12-31", "admin_notes": "ok" })),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "approved");
    assert_eq!(json["data"]["approved_until"], "2099-12-31");
    assert_eq!(json["data"]["ref"], "GC-1");

    let stored = db.get_user_plan("buyer@example.com").await.expect("plan");
    assert_eq!(stored.plan, Plan::Premium);
    assert_eq!(stored.premium_until.as_deref(), Some("2099-12-31"));

    for action in ["approve", "reject"] {
        let response = app
            .clone()
            .oneshot(admin(
                "POST",
                &format!("/api/admin/upgrades/{id}/{action}"),
                Some(json!({})),
            ))
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::CONFLICT, "{action}");
    }
}

#[tokio::test]
async fn test_reject_leaves_plan_untouched() {
    let (db, app) = setup();
    let id = submit(&db, "nope@example.com", Plan::Pro).await;

    let response = app
        .oneshot(admin(
            "POST",
            &format!("/api/admin/upgrades/{id}/reject"),
            Some(json!({ "admin_notes": "blurry receipt" })),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "rejected");
    assert_eq!(json["data"]["admin_notes"], "blurry receipt");

    let stored = db.get_user_plan("nope@example.com").await.expect("plan");
    assert_eq!(stored.plan, Plan::Free);
}

#[tokio::test]
async fn test_approve_rejects_malformed_date() {
    let (db, app) = setup();
    let id = submit(&db, "date@example.com", Plan::Premium).await;

    let response = app
        .oneshot(admin(
            "POST",
            &format!("/api/admin/upgrades/{id}/approve"),
            Some(json!({ "approved_until": "12/31/2099" })),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let still_pending = db
        .get_upgrade_request(id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(still_pending.status.as_str(), "pending");
}

#[tokio::test]
async fn test_unknown_upgrade_is_404() {
    let (_, app) = setup();
    let response = app
        .clone()
        .oneshot(admin("GET", "/api/admin/upgrades/999", None))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(admin(
            "POST",
            "/api/admin/upgrades/999/approve",
            Some(json!({})),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_upgrades_filters_by_status() {
    let (db, app) = setup();
    let first = submit(&db, "a@example.com", Plan::Premium).await;
    let second = submit(&db, "b@example.com", Plan::Pro).await;
    app.clone()
        .oneshot(admin(
            "POST",
            &format!("/api/admin/upgrades/{first}/reject"),
            Some(json!({})),
        ))
        .await
        .expect("request");

    let response = app
        .clone()
        .oneshot(admin("GET", "/api/admin/upgrades?status=pending", None))
        .await
        .expect("request");
    let json = json_body(response).await;
    let items = json["data"].as_array().expect("array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], second);

    let response = app
        .clone()
        .oneshot(admin("GET", "/api/admin/upgrades", None))
        .await
        .expect("request");
    let json = json_body(response).await;
    assert_eq!(json["data"].as_array().expect("array").len(), 2);

    let response = app
        .oneshot(admin("GET", "/api/admin/upgrades?status=maybe", None))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_user_plan_via_put() {
    let (db, app) = setup();
    let response = app
        .clone()
        .oneshot(admin(
            "PUT",
            "/api/admin/users/gift%40example.com/plan",
            Some(json!({ "plan": "pro", "premium_until": "" })),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["email"], "gift@example.com");
    assert_eq!(json["data"]["plan"], "pro");
    assert_eq!(json["data"]["premium_until"], Value::Null);

    let stored = db.get_user_plan("gift@example.com").await.expect("plan");
    assert_eq!(stored.plan, Plan::Pro);

    let response = app
        .oneshot(admin(
            "PUT",
            "/api/admin/users/gift%40example.com/plan",
            Some(json!({ "plan": "platinum" })),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_users_list_keeps_lapsed_plan() {
    let (db, app) = setup();
    db.set_user_plan("lapsed@example.com", Plan::Premium, Some("2020-01-01"))
        .await
        .expect("set plan");

    let response = app
        .oneshot(admin("GET", "/api/admin/users?limit=5", None))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let users = json["data"].as_array().expect("array");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["plan"], "premium");
    assert_eq!(users[0]["premium_until"], "2020-01-01");
}

#[tokio::test]
async fn test_stats_reports_today_and_totals() {
    let (_, app) = setup();
    for (email, category) in [
        ("a@example.com", "phishing"),
        ("b@example.com", "phishing"),
        ("b@example.com", "investment"),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/checks")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "email": email,
                            "verdict": "scam",
                            "confidence": 80,
                            "category": category
                        })
                        .to_string(),
                    ))
                    .expect("build request"),
            )
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(admin("GET", "/api/admin/stats", None))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["totals"]["total_scans"], 3);
    assert_eq!(json["data"]["today"]["scans"], 3);
    assert_eq!(json["data"]["today"]["unique_users"], 2);
    assert_eq!(json["data"]["trending_categories"][0]["category"], "phishing");
    assert_eq!(json["data"]["trending_categories"][0]["count"], 2);
}
