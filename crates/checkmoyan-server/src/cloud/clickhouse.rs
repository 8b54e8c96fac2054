use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use checkmoyan_core::{
    plan::{Plan, User, UserPlan},
    scan::{CategoryCount, DailyStats, NewScan, Totals},
    store::EntitlementStore,
    upgrade::{NewUpgradeRequest, UpgradeDecision, UpgradeRequest, UpgradeStatus},
};

const DATABASE: &str = "checkmoyan";

/// ClickHouse spelling of SQL NULL in a query parameter.
const CH_NULL: &str = "\\N";

/// HTTP client wrapper for ClickHouse.
///
/// SQL is posted as the request body; named parameters travel as
/// `param_<name>` query-string entries so ClickHouse substitutes them
/// server-side (no SQL injection).
#[derive(Clone)]
pub struct ClickHouseClient {
    client: Client,
    url: String,
    user: String,
    password: String,
}

impl ClickHouseClient {
    pub fn new(url: &str, user: &str, password: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    fn url_with(&self, named_params: &[(&str, String)], json: bool) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.url).context("Invalid ClickHouse URL")?;
        {
            let mut qs = url.query_pairs_mut();
            qs.append_pair("database", DATABASE);
            if json {
                qs.append_pair("default_format", "JSON");
            }
            for (k, v) in named_params {
                qs.append_pair(&format!("param_{k}"), v);
            }
        }
        Ok(url)
    }

    async fn post(&self, url: reqwest::Url, sql: &str) -> Result<reqwest::Response> {
        let resp = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .body(sql.to_string())
            .send()
            .await
            .context("ClickHouse HTTP request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("ClickHouse error {status}: {body}");
        }
        Ok(resp)
    }

    /// Run a SELECT and return the `data` array.
    async fn query(&self, sql: &str, named_params: &[(&str, String)]) -> Result<Vec<Value>> {
        let url = self.url_with(named_params, true)?;
        let json: Value = self
            .post(url, sql)
            .await?
            .json()
            .await
            .context("ClickHouse response parse failed")?;
        Ok(json
            .get("data")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    /// Run a statement that returns no rows (DDL, INSERT ... SELECT).
    async fn execute(&self, sql: &str, named_params: &[(&str, String)]) -> Result<()> {
        let url = self.url_with(named_params, false)?;
        self.post(url, sql).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Schema migration (idempotent, uses IF NOT EXISTS)
// ---------------------------------------------------------------------------

/// Apply the ClickHouse schema on startup.
///
/// Mutable rows (`users`, `upgrade_requests`) live in `ReplacingMergeTree`
/// tables: every write inserts a full row with a higher `version` and reads
/// use `FINAL`. Usage counters are a `SummingMergeTree`, so an increment is an
/// append of `1` and concurrent writers never lose a count.
pub async fn clickhouse_migrate(client: &ClickHouseClient) -> Result<()> {
    info!("Running ClickHouse schema migration");

    client
        .execute(&format!("CREATE DATABASE IF NOT EXISTS {DATABASE}"), &[])
        .await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS checkmoyan.users (
                email           String,
                plan            LowCardinality(String),
                premium_until   Nullable(String),
                created_at      DateTime64(3, 'UTC'),
                version         UInt64
            ) ENGINE = ReplacingMergeTree(version)
            ORDER BY email",
            &[],
        )
        .await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS checkmoyan.usage_daily (
                email           String,
                day             Date,
                scan_count      UInt64
            ) ENGINE = SummingMergeTree(scan_count)
            ORDER BY (email, day)",
            &[],
        )
        .await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS checkmoyan.scans (
                id                  Int64,
                email               String,
                day                 Date,
                verdict             LowCardinality(String),
                confidence          Int32,
                category            LowCardinality(String),
                signals             String,
                content_fingerprint String,
                created_at          DateTime64(3, 'UTC')
            ) ENGINE = MergeTree()
            PARTITION BY toYYYYMM(day)
            ORDER BY (day, category, id)",
            &[],
        )
        .await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS checkmoyan.upgrade_requests (
                id              Int64,
                email           String,
                plan            LowCardinality(String),
                method          LowCardinality(String),
                payment_ref     Nullable(String),
                receipt_path    Nullable(String),
                status          LowCardinality(String),
                admin_notes     Nullable(String),
                approved_until  Nullable(String),
                created_at      DateTime64(3, 'UTC'),
                version         UInt64
            ) ENGINE = ReplacingMergeTree(version)
            ORDER BY id",
            &[],
        )
        .await?;

    info!("ClickHouse schema migration complete");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn day_to_ch(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn nullable(v: Option<&str>) -> String {
    v.map_or_else(|| CH_NULL.to_string(), str::to_string)
}

/// ClickHouse quotes 64-bit integers in JSON output; accept both shapes.
fn int_field(row: &Value, key: &str) -> Result<i64> {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| anyhow!("{key} out of range")),
        Some(Value::String(s)) => s.parse().with_context(|| format!("{key} is not an integer")),
        _ => Err(anyhow!("missing integer column {key}")),
    }
}

fn str_field(row: &Value, key: &str) -> Result<String> {
    row.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("missing string column {key}"))
}

fn opt_str_field(row: &Value, key: &str) -> Option<String> {
    row.get(key).and_then(Value::as_str).map(str::to_string)
}

fn upgrade_from_row(row: &Value) -> Result<UpgradeRequest> {
    let id = int_field(row, "id")?;
    let status = str_field(row, "status")?
        .parse::<UpgradeStatus>()
        .with_context(|| format!("upgrade request {id} has invalid status"))?;
    Ok(UpgradeRequest {
        id,
        email: str_field(row, "email")?,
        plan: Plan::from_stored(&str_field(row, "plan")?),
        method: str_field(row, "method")?,
        payment_ref: opt_str_field(row, "payment_ref"),
        receipt_path: opt_str_field(row, "receipt_path"),
        status,
        admin_notes: opt_str_field(row, "admin_notes"),
        approved_until: opt_str_field(row, "approved_until"),
        created_at: str_field(row, "created_at")?,
    })
}

/// Strictly increasing ids seeded from the wall clock in microseconds.
///
/// ClickHouse has no sequences, so scan ids, request ids and row versions
/// are minted here. Values stay unique within the process and keep growing
/// across restarts as long as the clock does.
#[derive(Debug, Default)]
pub(crate) struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub(crate) fn next(&self) -> i64 {
        self.next_at(Utc::now().timestamp_micros())
    }

    pub(crate) fn next_at(&self, micros: i64) -> i64 {
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = micros.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

const UPGRADE_COLUMNS: &str = "SELECT id, email, plan, method, payment_ref, receipt_path, status, \
     admin_notes, approved_until, toString(created_at) AS created_at \
     FROM upgrade_requests FINAL";

/// [`EntitlementStore`] over ClickHouse.
///
/// Approval uses the trait's default three-step sequence; ClickHouse has no
/// multi-statement transactions.
pub struct ClickHouseStore {
    client: ClickHouseClient,
    ids: IdGenerator,
}

impl ClickHouseStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self {
            client,
            ids: IdGenerator::default(),
        }
    }
}

#[async_trait]
impl EntitlementStore for ClickHouseStore {
    async fn ensure_user(&self, email: &str) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO users (email, plan, premium_until, created_at, version) \
                 SELECT {email:String}, 'free', NULL, now64(3), 0 \
                 WHERE (SELECT count() FROM users WHERE email = {email:String}) = 0",
                &[("email", email.to_string())],
            )
            .await
    }

    async fn get_user_plan(&self, email: &str) -> Result<UserPlan> {
        let rows = self
            .client
            .query(
                "SELECT plan, premium_until FROM users FINAL \
                 WHERE email = {email:String} LIMIT 1",
                &[("email", email.to_string())],
            )
            .await?;
        Ok(match rows.first() {
            Some(row) => UserPlan {
                plan: Plan::from_stored(&str_field(row, "plan")?),
                premium_until: opt_str_field(row, "premium_until"),
            },
            None => UserPlan::default(),
        })
    }

    /// Inserts a newer version of the row, keeping the original `created_at`.
    async fn set_user_plan(
        &self,
        email: &str,
        plan: Plan,
        premium_until: Option<&str>,
    ) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO users (email, plan, premium_until, created_at, version) \
                 SELECT {email:String}, {plan:String}, {premium_until:Nullable(String)}, \
                        if(count() = 0, now64(3), min(created_at)), {version:UInt64} \
                 FROM users WHERE email = {email:String}",
                &[
                    ("email", email.to_string()),
                    ("plan", plan.as_str().to_string()),
                    ("premium_until", nullable(premium_until)),
                    ("version", self.ids.next().to_string()),
                ],
            )
            .await
    }

    async fn record_usage(&self, email: &str, day: NaiveDate) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO usage_daily (email, day, scan_count) \
                 SELECT {email:String}, {day:Date}, 1",
                &[("email", email.to_string()), ("day", day_to_ch(day))],
            )
            .await
    }

    async fn get_usage(&self, email: &str, day: NaiveDate) -> Result<u32> {
        let rows = self
            .client
            .query(
                "SELECT sum(scan_count) AS n FROM usage_daily \
                 WHERE email = {email:String} AND day = {day:Date}",
                &[("email", email.to_string()), ("day", day_to_ch(day))],
            )
            .await?;
        let n = match rows.first() {
            Some(row) => int_field(row, "n")?,
            None => 0,
        };
        Ok(u32::try_from(n).unwrap_or(u32::MAX))
    }

    async fn insert_scan(&self, scan: &NewScan) -> Result<i64> {
        let id = self.ids.next();
        self.client
            .execute(
                "INSERT INTO scans (id, email, day, verdict, confidence, category, signals, \
                                    content_fingerprint, created_at) \
                 SELECT {id:Int64}, {email:String}, {day:Date}, {verdict:String}, \
                        {confidence:Int32}, {category:String}, {signals:String}, \
                        {fingerprint:String}, now64(3)",
                &[
                    ("id", id.to_string()),
                    ("email", scan.email.clone()),
                    ("day", day_to_ch(scan.day)),
                    ("verdict", scan.verdict.clone()),
                    ("confidence", scan.confidence.to_string()),
                    ("category", scan.category.clone()),
                    ("signals", scan.signals.clone()),
                    ("fingerprint", scan.content_fingerprint.clone()),
                ],
            )
            .await?;
        Ok(id)
    }

    async fn insert_upgrade_request(&self, request: &NewUpgradeRequest) -> Result<i64> {
        let id = self.ids.next();
        self.client
            .execute(
                "INSERT INTO upgrade_requests (id, email, plan, method, payment_ref, receipt_path, \
                                               status, admin_notes, approved_until, created_at, version) \
                 SELECT {id:Int64}, {email:String}, {plan:String}, {method:String}, \
                        {payment_ref:Nullable(String)}, {receipt_path:Nullable(String)}, \
                        'pending', NULL, NULL, now64(3), 0",
                &[
                    ("id", id.to_string()),
                    ("email", request.email.clone()),
                    ("plan", request.plan.as_str().to_string()),
                    ("method", request.method.clone()),
                    ("payment_ref", nullable(request.payment_ref.as_deref())),
                    ("receipt_path", nullable(request.receipt_path.as_deref())),
                ],
            )
            .await?;
        Ok(id)
    }

    async fn list_upgrade_requests(
        &self,
        status: Option<UpgradeStatus>,
    ) -> Result<Vec<UpgradeRequest>> {
        let rows = match status {
            Some(status) => {
                self.client
                    .query(
                        &format!(
                            "{UPGRADE_COLUMNS} WHERE status = {{status:String}} \
                             ORDER BY created_at DESC, id DESC"
                        ),
                        &[("status", status.as_str().to_string())],
                    )
                    .await?
            }
            None => {
                self.client
                    .query(
                        &format!("{UPGRADE_COLUMNS} ORDER BY created_at DESC, id DESC"),
                        &[],
                    )
                    .await?
            }
        };
        rows.iter().map(upgrade_from_row).collect()
    }

    async fn get_upgrade_request(&self, id: i64) -> Result<Option<UpgradeRequest>> {
        let rows = self
            .client
            .query(
                &format!("{UPGRADE_COLUMNS} WHERE id = {{id:Int64}}"),
                &[("id", id.to_string())],
            )
            .await?;
        rows.first().map(upgrade_from_row).transpose()
    }

    /// Copies the current row forward with the decision applied.
    async fn update_upgrade_request(&self, id: i64, decision: &UpgradeDecision) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO upgrade_requests (id, email, plan, method, payment_ref, receipt_path, \
                                               status, admin_notes, approved_until, created_at, version) \
                 SELECT id, email, plan, method, payment_ref, receipt_path, \
                        {status:String}, {admin_notes:Nullable(String)}, \
                        {approved_until:Nullable(String)}, created_at, {version:UInt64} \
                 FROM upgrade_requests FINAL WHERE id = {id:Int64}",
                &[
                    ("id", id.to_string()),
                    ("status", decision.status.as_str().to_string()),
                    ("admin_notes", nullable(decision.admin_notes.as_deref())),
                    ("approved_until", nullable(decision.approved_until.as_deref())),
                    ("version", self.ids.next().to_string()),
                ],
            )
            .await
    }

    async fn list_users(&self, limit: i64) -> Result<Vec<User>> {
        let rows = self
            .client
            .query(
                "SELECT email, plan, premium_until, toString(created_at) AS created_at \
                 FROM users FINAL ORDER BY created_at DESC, email ASC LIMIT {limit:UInt32}",
                &[("limit", limit.max(0).to_string())],
            )
            .await?;
        rows.iter()
            .map(|row| {
                Ok(User {
                    email: str_field(row, "email")?,
                    plan: Plan::from_stored(&str_field(row, "plan")?),
                    premium_until: opt_str_field(row, "premium_until"),
                    created_at: str_field(row, "created_at")?,
                })
            })
            .collect()
    }

    async fn get_stats(&self, day: NaiveDate) -> Result<DailyStats> {
        let rows = self
            .client
            .query(
                "SELECT count() AS scans, uniqExact(email) AS unique_users \
                 FROM scans WHERE day = {day:Date}",
                &[("day", day_to_ch(day))],
            )
            .await?;
        let (scans, unique_users) = match rows.first() {
            Some(row) => (int_field(row, "scans")?, int_field(row, "unique_users")?),
            None => (0, 0),
        };
        Ok(DailyStats {
            day: day_to_ch(day),
            scans,
            unique_users,
        })
    }

    async fn get_trending_categories(
        &self,
        day: NaiveDate,
        limit: i64,
    ) -> Result<Vec<CategoryCount>> {
        let rows = self
            .client
            .query(
                "SELECT category, count() AS n FROM scans \
                 WHERE day = {day:Date} AND category != '' \
                 GROUP BY category ORDER BY n DESC, category ASC LIMIT {limit:UInt32}",
                &[("day", day_to_ch(day)), ("limit", limit.max(0).to_string())],
            )
            .await?;
        rows.iter()
            .map(|row| {
                Ok(CategoryCount {
                    category: str_field(row, "category")?,
                    count: int_field(row, "n")?,
                })
            })
            .collect()
    }

    async fn get_totals(&self) -> Result<Totals> {
        let rows = self
            .client
            .query(
                "SELECT (SELECT count() FROM scans) AS total_scans, \
                        (SELECT count() FROM users FINAL) AS total_users",
                &[],
            )
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| anyhow!("ClickHouse returned no totals row"))?;
        Ok(Totals {
            total_scans: int_field(row, "total_scans")?,
            total_users: int_field(row, "total_users")?,
        })
    }

    async fn ping(&self) -> Result<()> {
        self.client.query("SELECT 1 AS ok", &[]).await?;
        Ok(())
    }
}
