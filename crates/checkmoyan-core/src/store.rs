use async_trait::async_trait;
use chrono::NaiveDate;

use crate::plan::{Plan, User, UserPlan};
use crate::scan::{CategoryCount, DailyStats, NewScan, Totals};
use crate::upgrade::{NewUpgradeRequest, UpgradeDecision, UpgradeRequest, UpgradeStatus};

/// Persistence contract for users, usage counters, scans and upgrade requests.
///
/// Self-hosted deployments use the embedded DuckDB implementation; cloud
/// deployments use the ClickHouse warehouse. Exactly one is constructed at
/// startup and the entitlement engine only ever sees this trait.
///
/// Usage days are supplied by the caller (a calendar date in the operator's
/// reference timezone), so stores never consult the wall clock for counters.
#[async_trait]
pub trait EntitlementStore: Send + Sync + 'static {
    /// Create the user with plan `free` if absent. Never resets an existing row.
    async fn ensure_user(&self, email: &str) -> anyhow::Result<()>;

    /// Stored plan fields. An unknown user reads as the default free plan.
    async fn get_user_plan(&self, email: &str) -> anyhow::Result<UserPlan>;

    /// Unconditionally overwrite `plan` and `premium_until`.
    async fn set_user_plan(
        &self,
        email: &str,
        plan: Plan,
        premium_until: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Atomically increment the counter for `(email, day)`, creating it at 1.
    async fn record_usage(&self, email: &str, day: NaiveDate) -> anyhow::Result<()>;

    /// Counter for `(email, day)`; 0 when no row exists.
    async fn get_usage(&self, email: &str, day: NaiveDate) -> anyhow::Result<u32>;

    /// Append a scan row and return its id.
    async fn insert_scan(&self, scan: &NewScan) -> anyhow::Result<i64>;

    /// Insert a `pending` upgrade request and return its id.
    async fn insert_upgrade_request(&self, request: &NewUpgradeRequest) -> anyhow::Result<i64>;

    /// All requests, optionally filtered by status, most recent first.
    async fn list_upgrade_requests(
        &self,
        status: Option<UpgradeStatus>,
    ) -> anyhow::Result<Vec<UpgradeRequest>>;

    async fn get_upgrade_request(&self, id: i64) -> anyhow::Result<Option<UpgradeRequest>>;

    /// Write a decision. Does not check the current status.
    async fn update_upgrade_request(
        &self,
        id: i64,
        decision: &UpgradeDecision,
    ) -> anyhow::Result<()>;

    /// Approve `request` and grant its plan until `approved_until`.
    ///
    /// The default runs three independent writes: ensure the user, mark the
    /// request approved, set the plan. A failure in the last step leaves the
    /// request approved without the grant and is returned to the caller.
    /// Stores with transactions override this to make the three writes atomic.
    async fn approve_upgrade_request(
        &self,
        request: &UpgradeRequest,
        approved_until: Option<&str>,
        admin_notes: Option<&str>,
    ) -> anyhow::Result<()> {
        self.ensure_user(&request.email).await?;
        self.update_upgrade_request(
            request.id,
            &UpgradeDecision {
                status: UpgradeStatus::Approved,
                admin_notes: admin_notes.map(str::to_string),
                approved_until: approved_until.map(str::to_string),
            },
        )
        .await?;
        self.set_user_plan(&request.email, request.plan, approved_until)
            .await
    }

    /// Most recently created users first.
    async fn list_users(&self, limit: i64) -> anyhow::Result<Vec<User>>;

    /// Scan volume for one day (operator timezone).
    async fn get_stats(&self, day: NaiveDate) -> anyhow::Result<DailyStats>;

    /// Non-empty categories scanned on `day`, most frequent first.
    async fn get_trending_categories(
        &self,
        day: NaiveDate,
        limit: i64,
    ) -> anyhow::Result<Vec<CategoryCount>>;

    async fn get_totals(&self) -> anyhow::Result<Totals>;

    /// Liveness probe used by `/health`.
    async fn ping(&self) -> anyhow::Result<()>;
}
