use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use checkmoyan_core::{
    entitlements::Entitlements,
    error::CoreError,
    payments::{DailyLimits, PaymentConfig},
    plan::{Plan, User, UserPlan},
    scan::{CategoryCount, DailyStats, NewScan, ScanOutcome, Totals, ANONYMOUS_USER},
    store::EntitlementStore,
    upgrade::{NewUpgradeRequest, UpgradeDecision, UpgradeRequest, UpgradeStatus},
};
use checkmoyan_duckdb::DuckDbBackend;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .expect("valid timestamp")
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
}

/// Midday in Manila, so UTC and operator dates agree.
fn noon() -> DateTime<Utc> {
    at(2025, 6, 15, 4, 0)
}

fn engine_with(limits: DailyLimits) -> (Arc<DuckDbBackend>, Entitlements) {
    let db = Arc::new(DuckDbBackend::open_in_memory().expect("in-memory duckdb"));
    let store: Arc<dyn EntitlementStore> = db.clone();
    (db, Entitlements::new(store, limits, chrono_tz::Asia::Manila))
}

fn engine() -> (Arc<DuckDbBackend>, Entitlements) {
    engine_with(DailyLimits::default())
}

fn outcome(verdict: &str, category: Option<&str>) -> ScanOutcome {
    ScanOutcome {
        verdict: verdict.to_string(),
        confidence: 87,
        category: category.map(str::to_string),
        signals: Some(vec!["urgency".to_string(), "link".to_string()]),
        content_fingerprint: Some(checkmoyan_core::fingerprint::fingerprint("win a prize")),
    }
}

fn upgrade(email: &str, plan: Plan) -> NewUpgradeRequest {
    NewUpgradeRequest {
        email: email.to_string(),
        plan,
        method: "gcash".to_string(),
        payment_ref: Some("REF-123".to_string()),
        receipt_path: None,
    }
}

#[tokio::test]
async fn unknown_user_gets_free_limit_and_default_row() {
    let (db, ent) = engine();

    let limit = ent
        .get_daily_limit_at(Some("new@example.com"), noon())
        .await
        .expect("limit");
    assert_eq!(limit, 2);

    let stored = db.get_user_plan("new@example.com").await.expect("plan");
    assert_eq!(stored.plan, Plan::Free);
    assert_eq!(stored.premium_until, None);
}

#[tokio::test]
async fn get_user_plan_for_missing_row_reads_as_free() {
    let (db, _) = engine();
    let stored = db.get_user_plan("ghost@example.com").await.expect("plan");
    assert_eq!(stored.plan, Plan::Free);
    assert!(db.list_users(10).await.expect("users").is_empty());
}

#[tokio::test]
async fn lapsed_premium_falls_back_to_free_limit() {
    let (db, ent) = engine();
    db.set_user_plan("lapsed@example.com", Plan::Premium, Some("2025-06-14"))
        .await
        .expect("set plan");

    let limit = ent
        .get_daily_limit_at(Some("lapsed@example.com"), noon())
        .await
        .expect("limit");
    assert_eq!(limit, 2);

    // The stored plan keeps the last paid tier.
    let stored = ent.resolve_plan("lapsed@example.com").await.expect("plan");
    assert_eq!(stored.plan, Plan::Premium);
}

#[tokio::test]
async fn premium_valid_through_today_gets_premium_limit() {
    let (db, ent) = engine();
    db.set_user_plan("today@example.com", Plan::Premium, Some("2025-06-15"))
        .await
        .expect("set plan");
    db.set_user_plan("later@example.com", Plan::Pro, Some("2026-01-01"))
        .await
        .expect("set plan");

    for email in ["today@example.com", "later@example.com"] {
        let limit = ent
            .get_daily_limit_at(Some(email), noon())
            .await
            .expect("limit");
        assert_eq!(limit, 9999, "{email}");
    }
}

#[tokio::test]
async fn expiry_compares_against_utc_date() {
    let (db, ent) = engine();
    db.set_user_plan("edge@example.com", Plan::Premium, Some("2025-06-15"))
        .await
        .expect("set plan");

    // 20:00 UTC is already the 16th in Manila, but still the 15th in UTC.
    let late = at(2025, 6, 15, 20, 0);
    assert_eq!(ent.usage_day(late), day("2025-06-16"));
    let plan = ent
        .effective_plan_at("edge@example.com", late)
        .await
        .expect("plan");
    assert_eq!(plan, Plan::Premium);
}

#[tokio::test]
async fn paid_plan_without_expiry_never_lapses() {
    let (db, ent) = engine();
    db.set_user_plan("forever@example.com", Plan::Pro, None)
        .await
        .expect("set plan");
    let plan = ent
        .effective_plan_at("forever@example.com", at(2031, 1, 1, 0, 0))
        .await
        .expect("plan");
    assert_eq!(plan, Plan::Pro);
}

#[tokio::test]
async fn malformed_expiry_reads_as_lapsed() {
    let (db, ent) = engine();
    db.set_user_plan("typo@example.com", Plan::Premium, Some("31/12/2025"))
        .await
        .expect("set plan");
    let plan = ent
        .effective_plan_at("typo@example.com", noon())
        .await
        .expect("plan");
    assert_eq!(plan, Plan::Free);
}

#[tokio::test]
async fn ensure_user_never_resets_plan() {
    let (db, ent) = engine();
    ent.set_plan("keep@example.com", Plan::Premium, Some("2025-12-31"))
        .await
        .expect("set plan");

    db.ensure_user("keep@example.com").await.expect("ensure");
    db.ensure_user("keep@example.com").await.expect("ensure");

    let stored = ent.resolve_plan("keep@example.com").await.expect("plan");
    assert_eq!(stored.plan, Plan::Premium);
    assert_eq!(stored.premium_until.as_deref(), Some("2025-12-31"));
}

#[tokio::test]
async fn set_plan_stores_blank_expiry_as_null() {
    let (_, ent) = engine();
    ent.set_plan("blank@example.com", Plan::Premium, Some("  "))
        .await
        .expect("set plan");
    let stored = ent.resolve_plan("blank@example.com").await.expect("plan");
    assert_eq!(stored.premium_until, None);
}

#[tokio::test]
async fn usage_counts_monotonically_and_resets_next_day() {
    let (db, ent) = engine();
    let email = Some("counter@example.com");

    for n in 1..=5u32 {
        ent.record_check_at(email, &outcome("scam", Some("phishing")), noon())
            .await
            .expect("record");
        assert_eq!(ent.usage_today_at(email, noon()).await.expect("usage"), n);
    }

    let tomorrow = noon() + Duration::days(1);
    assert_eq!(ent.usage_today_at(email, tomorrow).await.expect("usage"), 0);

    ent.record_check_at(email, &outcome("safe", None), tomorrow)
        .await
        .expect("record");
    assert_eq!(ent.usage_today_at(email, tomorrow).await.expect("usage"), 1);
    assert_eq!(
        db.get_usage("counter@example.com", day("2025-06-15"))
            .await
            .expect("usage"),
        5
    );
}

#[tokio::test]
async fn usage_day_rolls_over_at_operator_midnight() {
    let (_, ent) = engine();
    let email = Some("night@example.com");

    // 15:59 UTC is 23:59 in Manila.
    let before = at(2025, 6, 15, 15, 59);
    let after = at(2025, 6, 15, 16, 1);
    ent.record_check_at(email, &outcome("safe", None), before)
        .await
        .expect("record");

    assert_eq!(ent.usage_today_at(email, before).await.expect("usage"), 1);
    assert_eq!(ent.usage_today_at(email, after).await.expect("usage"), 0);
}

#[tokio::test]
async fn third_free_check_is_denied_with_message() {
    let (_, ent) = engine_with(DailyLimits {
        free: 2,
        premium: 9999,
    });
    let email = Some("free@example.com");

    for used in 0..2u32 {
        let decision = ent.can_check_at(email, noon()).await.expect("quota");
        assert!(decision.allowed);
        assert_eq!(decision.used, used);
        assert_eq!(decision.reason, "");
        ent.record_check_at(email, &outcome("safe", None), noon())
            .await
            .expect("record");
    }

    let denied = ent.can_check_at(email, noon()).await.expect("quota");
    assert!(!denied.allowed);
    assert_eq!(denied.used, 2);
    assert_eq!(denied.limit, 2);
    assert_eq!(
        denied.reason,
        "You've used 2 of 2 free checks today. Upgrade to Premium for unlimited checks."
    );
}

#[tokio::test]
async fn anonymous_callers_share_one_free_bucket() {
    let (db, ent) = engine();
    db.set_user_plan(ANONYMOUS_USER, Plan::Pro, None)
        .await
        .expect("set plan");
    db.set_user_plan("paid@example.com", Plan::Premium, None)
        .await
        .expect("set plan");

    assert_eq!(ent.get_daily_limit_at(None, noon()).await.expect("limit"), 2);
    assert_eq!(
        ent.get_daily_limit_at(Some(""), noon()).await.expect("limit"),
        2
    );

    ent.record_check_at(None, &outcome("safe", None), noon())
        .await
        .expect("record");
    ent.record_check_at(Some(""), &outcome("safe", None), noon())
        .await
        .expect("record");

    assert_eq!(
        db.get_usage(ANONYMOUS_USER, day("2025-06-15"))
            .await
            .expect("usage"),
        2
    );
    let decision = ent.can_check_at(None, noon()).await.expect("quota");
    assert!(!decision.allowed);
}

#[tokio::test]
async fn anonymous_limit_check_creates_no_user() {
    let (db, ent) = engine();
    ent.get_daily_limit_at(None, noon()).await.expect("limit");
    assert_eq!(db.get_totals().await.expect("totals").total_users, 0);
}

#[tokio::test]
async fn record_check_stores_outcome_without_content() {
    let (db, ent) = engine();
    let id = ent
        .record_check_at(
            Some("scan@example.com"),
            &outcome("scam", Some("phishing")),
            noon(),
        )
        .await
        .expect("record");
    assert!(id > 0);

    let conn = db.conn_for_test().await;
    let (verdict, category, signals, fp): (String, String, String, String) = conn
        .query_row(
            "SELECT verdict, category, signals, content_fingerprint FROM scans WHERE id = ?1",
            checkmoyan_duckdb::duckdb::params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .expect("scan row");
    assert_eq!(verdict, "scam");
    assert_eq!(category, "phishing");
    assert_eq!(signals, r#"["urgency","link"]"#);
    assert_eq!(fp.len(), 64);
}

#[tokio::test]
async fn scan_defaults_fill_missing_fields() {
    let (db, ent) = engine();
    let bare = ScanOutcome {
        verdict: "safe".to_string(),
        confidence: 10,
        ..ScanOutcome::default()
    };
    let id = ent
        .record_check_at(Some("bare@example.com"), &bare, noon())
        .await
        .expect("record");

    let conn = db.conn_for_test().await;
    let (category, signals, fp): (String, String, String) = conn
        .query_row(
            "SELECT category, signals, content_fingerprint FROM scans WHERE id = ?1",
            checkmoyan_duckdb::duckdb::params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("scan row");
    assert_eq!(category, "");
    assert_eq!(signals, "[]");
    assert_eq!(fp, "");
}

#[tokio::test]
async fn upgrade_lifecycle_approve_grants_plan() {
    let (_, ent) = engine();
    let id = ent
        .submit_upgrade(&upgrade("buyer@example.com", Plan::Premium))
        .await
        .expect("submit");

    let pending = ent.get_upgrade(id).await.expect("get");
    assert_eq!(pending.status, UpgradeStatus::Pending);
    assert_eq!(pending.payment_ref.as_deref(), Some("REF-123"));

    ent.approve_upgrade(id, Some("2025-12-31"), Some("paid via gcash"))
        .await
        .expect("approve");

    let approved = ent.get_upgrade(id).await.expect("get");
    assert_eq!(approved.status, UpgradeStatus::Approved);
    assert_eq!(approved.approved_until.as_deref(), Some("2025-12-31"));
    assert_eq!(approved.admin_notes.as_deref(), Some("paid via gcash"));

    let stored = ent.resolve_plan("buyer@example.com").await.expect("plan");
    assert_eq!(stored.plan, Plan::Premium);
    assert_eq!(stored.premium_until.as_deref(), Some("2025-12-31"));
    assert_eq!(
        ent.effective_plan_at("buyer@example.com", noon())
            .await
            .expect("plan"),
        Plan::Premium
    );
}

#[tokio::test]
async fn upgrade_reject_leaves_plan_alone() {
    let (_, ent) = engine();
    ent.set_plan("reject@example.com", Plan::Free, None)
        .await
        .expect("set plan");
    let id = ent
        .submit_upgrade(&upgrade("reject@example.com", Plan::Pro))
        .await
        .expect("submit");

    ent.reject_upgrade(id, Some("receipt unreadable"))
        .await
        .expect("reject");

    let rejected = ent.get_upgrade(id).await.expect("get");
    assert_eq!(rejected.status, UpgradeStatus::Rejected);
    assert_eq!(rejected.approved_until, None);
    let stored = ent.resolve_plan("reject@example.com").await.expect("plan");
    assert_eq!(stored.plan, Plan::Free);
}

#[tokio::test]
async fn approving_unknown_user_creates_them() {
    let (db, ent) = engine();
    let id = ent
        .submit_upgrade(&upgrade("fresh@example.com", Plan::Pro))
        .await
        .expect("submit");
    ent.approve_upgrade(id, None, None).await.expect("approve");

    let users = db.list_users(10).await.expect("users");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].plan, Plan::Pro);
    assert_eq!(users[0].premium_until, None);
}

/// DuckDB store whose plan writes always fail. Uses the trait's default
/// (non-transactional) approval.
struct PlanWriteFails {
    inner: DuckDbBackend,
}

#[async_trait]
impl EntitlementStore for PlanWriteFails {
    async fn ensure_user(&self, email: &str) -> anyhow::Result<()> {
        self.inner.ensure_user(email).await
    }

    async fn get_user_plan(&self, email: &str) -> anyhow::Result<UserPlan> {
        self.inner.get_user_plan(email).await
    }

    async fn set_user_plan(
        &self,
        _email: &str,
        _plan: Plan,
        _premium_until: Option<&str>,
    ) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("warehouse unavailable"))
    }

    async fn record_usage(&self, email: &str, day: NaiveDate) -> anyhow::Result<()> {
        self.inner.record_usage(email, day).await
    }

    async fn get_usage(&self, email: &str, day: NaiveDate) -> anyhow::Result<u32> {
        self.inner.get_usage(email, day).await
    }

    async fn insert_scan(&self, scan: &NewScan) -> anyhow::Result<i64> {
        self.inner.insert_scan(scan).await
    }

    async fn insert_upgrade_request(&self, request: &NewUpgradeRequest) -> anyhow::Result<i64> {
        self.inner.insert_upgrade_request(request).await
    }

    async fn list_upgrade_requests(
        &self,
        status: Option<UpgradeStatus>,
    ) -> anyhow::Result<Vec<UpgradeRequest>> {
        self.inner.list_upgrade_requests(status).await
    }

    async fn get_upgrade_request(&self, id: i64) -> anyhow::Result<Option<UpgradeRequest>> {
        self.inner.get_upgrade_request(id).await
    }

    async fn update_upgrade_request(
        &self,
        id: i64,
        decision: &UpgradeDecision,
    ) -> anyhow::Result<()> {
        self.inner.update_upgrade_request(id, decision).await
    }

    async fn list_users(&self, limit: i64) -> anyhow::Result<Vec<User>> {
        self.inner.list_users(limit).await
    }

    async fn get_stats(&self, day: NaiveDate) -> anyhow::Result<DailyStats> {
        self.inner.get_stats(day).await
    }

    async fn get_trending_categories(
        &self,
        day: NaiveDate,
        limit: i64,
    ) -> anyhow::Result<Vec<CategoryCount>> {
        self.inner.get_trending_categories(day, limit).await
    }

    async fn get_totals(&self) -> anyhow::Result<Totals> {
        self.inner.get_totals().await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn default_approval_failure_leaves_request_approved_without_grant() {
    let store = Arc::new(PlanWriteFails {
        inner: DuckDbBackend::open_in_memory().expect("in-memory duckdb"),
    });
    let ent = Entitlements::new(
        store.clone(),
        DailyLimits::default(),
        chrono_tz::Asia::Manila,
    );
    let id = ent
        .submit_upgrade(&upgrade("halfway@example.com", Plan::Premium))
        .await
        .expect("submit");

    let result = ent.approve_upgrade(id, Some("2025-12-31"), None).await;
    assert!(
        matches!(result, Err(CoreError::Storage(_))),
        "expected storage error, got {result:?}"
    );

    let request = ent.get_upgrade(id).await.expect("get");
    assert_eq!(request.status, UpgradeStatus::Approved);
    assert_eq!(request.approved_until.as_deref(), Some("2025-12-31"));

    let stored = store
        .get_user_plan("halfway@example.com")
        .await
        .expect("plan");
    assert_eq!(stored.plan, Plan::Free);
    assert_eq!(stored.premium_until, None);
}

#[tokio::test]
async fn duckdb_approval_failure_rolls_back_every_write() {
    let (db, ent) = engine();
    {
        let conn = db.conn_for_test().await;
        conn.execute_batch(
            "DROP TABLE users;
             CREATE TABLE users (
                 email VARCHAR PRIMARY KEY,
                 plan VARCHAR NOT NULL DEFAULT 'free' CHECK (plan <> 'pro'),
                 premium_until VARCHAR,
                 created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
             );",
        )
        .expect("swap users table");
    }
    let id = ent
        .submit_upgrade(&upgrade("atomic@example.com", Plan::Pro))
        .await
        .expect("submit");

    let result = ent.approve_upgrade(id, Some("2025-12-31"), Some("ok")).await;
    assert!(
        matches!(result, Err(CoreError::Storage(_))),
        "expected storage error, got {result:?}"
    );

    let request = ent.get_upgrade(id).await.expect("get");
    assert_eq!(request.status, UpgradeStatus::Pending);
    assert_eq!(request.approved_until, None);
    assert_eq!(request.admin_notes, None);
    assert!(db.list_users(10).await.expect("users").is_empty());
}

#[tokio::test]
async fn missing_upgrade_request_is_not_found() {
    let (_, ent) = engine();
    match ent.approve_upgrade(42, Some("2025-12-31"), None).await {
        Err(CoreError::UpgradeRequestNotFound(42)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
    match ent.reject_upgrade(42, None).await {
        Err(CoreError::UpgradeRequestNotFound(42)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn list_upgrades_filters_by_status_newest_first() {
    let (_, ent) = engine();
    let first = ent
        .submit_upgrade(&upgrade("a@example.com", Plan::Premium))
        .await
        .expect("submit");
    let second = ent
        .submit_upgrade(&upgrade("b@example.com", Plan::Premium))
        .await
        .expect("submit");
    let third = ent
        .submit_upgrade(&upgrade("c@example.com", Plan::Pro))
        .await
        .expect("submit");
    ent.reject_upgrade(second, None).await.expect("reject");

    let all = ent.list_upgrades(None).await.expect("list");
    let ids: Vec<i64> = all.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![third, second, first]);

    let pending = ent
        .list_upgrades(Some(UpgradeStatus::Pending))
        .await
        .expect("list");
    let ids: Vec<i64> = pending.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![third, first]);

    let rejected = ent
        .list_upgrades(Some(UpgradeStatus::Rejected))
        .await
        .expect("list");
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].email, "b@example.com");
}

#[tokio::test]
async fn submit_keeps_identifiers_and_drops_blank_fields() {
    let (_, ent) = engine();
    let id = ent
        .submit_upgrade(&NewUpgradeRequest {
            email: "  pad@example.com ".to_string(),
            plan: Plan::Premium,
            method: " maya ".to_string(),
            payment_ref: Some("   ".to_string()),
            receipt_path: Some("".to_string()),
        })
        .await
        .expect("submit");
    let req = ent.get_upgrade(id).await.expect("get");
    assert_eq!(req.email, "  pad@example.com ");
    assert_eq!(req.method, " maya ");
    assert_eq!(req.payment_ref, None);
    assert_eq!(req.receipt_path, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_usage_increments_are_not_lost() {
    let (db, _) = engine();
    let today = day("2025-06-15");
    let handles: Vec<_> = (0..50)
        .map(|_| {
            let db = Arc::clone(&db);
            tokio::spawn(async move { db.record_usage("concurrent@example.com", today).await })
        })
        .collect();
    for handle in handles {
        handle.await.expect("join").expect("record usage");
    }
    assert_eq!(
        db.get_usage("concurrent@example.com", today)
            .await
            .expect("usage"),
        50
    );
}

#[tokio::test]
async fn stats_and_trending_for_a_day() {
    let (db, ent) = engine();
    let today = noon();
    for (email, category) in [
        ("a@example.com", Some("phishing")),
        ("a@example.com", Some("phishing")),
        ("b@example.com", Some("investment")),
        ("b@example.com", Some("job")),
        ("c@example.com", Some("investment")),
        ("c@example.com", None),
    ] {
        ent.record_check_at(Some(email), &outcome("scam", category), today)
            .await
            .expect("record");
    }
    ent.record_check_at(
        Some("a@example.com"),
        &outcome("scam", Some("lottery")),
        today - Duration::days(1),
    )
    .await
    .expect("record");

    let stats = db.get_stats(day("2025-06-15")).await.expect("stats");
    assert_eq!(stats.day, "2025-06-15");
    assert_eq!(stats.scans, 6);
    assert_eq!(stats.unique_users, 3);

    let trending = db
        .get_trending_categories(day("2025-06-15"), 2)
        .await
        .expect("trending");
    let names: Vec<&str> = trending.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(names, vec!["investment", "phishing"]);
    assert_eq!(trending[0].count, 2);

    let totals = ent.totals().await.expect("totals");
    assert_eq!(totals.total_scans, 7);
    assert_eq!(totals.total_users, 0);
}

#[tokio::test]
async fn list_users_respects_limit() {
    let (_, ent) = engine();
    for email in ["x@example.com", "y@example.com", "z@example.com"] {
        ent.resolve_plan(email).await.expect("resolve");
    }
    let users = ent.list_users(2).await.expect("users");
    assert_eq!(users.len(), 2);
    assert_eq!(ent.totals().await.expect("totals").total_users, 3);
}

#[tokio::test]
async fn empty_payments_config_uses_defaults() {
    let cfg = PaymentConfig::from_value(&toml::Value::Table(Default::default()));
    assert_eq!(cfg.limits(), DailyLimits::default());
    assert_eq!(cfg.gcash_number, "");
    assert_eq!(cfg.maya_name, "");

    let (_, ent) = engine_with(cfg.limits());
    assert_eq!(
        ent.get_daily_limit_at(Some("d@example.com"), noon())
            .await
            .expect("limit"),
        2
    );
}

#[tokio::test]
async fn data_survives_reopen() {
    let dir = std::env::temp_dir().join(format!("checkmoyan-reopen-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("tmp dir");
    let path = dir.join("checkmoyan.db");
    let path = path.to_str().expect("utf8 path");

    {
        let db = DuckDbBackend::open(path, "256MB").expect("open");
        db.set_user_plan("persist@example.com", Plan::Pro, Some("2030-01-01"))
            .await
            .expect("set plan");
    }
    let db = DuckDbBackend::open(path, "256MB").expect("reopen");
    let stored = db.get_user_plan("persist@example.com").await.expect("plan");
    assert_eq!(stored.plan, Plan::Pro);
    db.ping().await.expect("ping");

    drop(db);
    let _ = std::fs::remove_dir_all(&dir);
}
