use async_trait::async_trait;
use chrono::NaiveDate;

use checkmoyan_core::plan::{Plan, User, UserPlan};
use checkmoyan_core::scan::{CategoryCount, DailyStats, NewScan, Totals};
use checkmoyan_core::store::EntitlementStore;
use checkmoyan_core::upgrade::{NewUpgradeRequest, UpgradeDecision, UpgradeRequest, UpgradeStatus};

use crate::DuckDbBackend;

#[async_trait]
impl EntitlementStore for DuckDbBackend {
    async fn ensure_user(&self, email: &str) -> anyhow::Result<()> {
        DuckDbBackend::ensure_user(self, email).await
    }

    async fn get_user_plan(&self, email: &str) -> anyhow::Result<UserPlan> {
        DuckDbBackend::get_user_plan(self, email).await
    }

    async fn set_user_plan(
        &self,
        email: &str,
        plan: Plan,
        premium_until: Option<&str>,
    ) -> anyhow::Result<()> {
        DuckDbBackend::set_user_plan(self, email, plan, premium_until).await
    }

    async fn record_usage(&self, email: &str, day: NaiveDate) -> anyhow::Result<()> {
        DuckDbBackend::record_usage(self, email, day).await
    }

    async fn get_usage(&self, email: &str, day: NaiveDate) -> anyhow::Result<u32> {
        DuckDbBackend::get_usage(self, email, day).await
    }

    async fn insert_scan(&self, scan: &NewScan) -> anyhow::Result<i64> {
        DuckDbBackend::insert_scan(self, scan).await
    }

    async fn insert_upgrade_request(&self, request: &NewUpgradeRequest) -> anyhow::Result<i64> {
        DuckDbBackend::insert_upgrade_request(self, request).await
    }

    async fn list_upgrade_requests(
        &self,
        status: Option<UpgradeStatus>,
    ) -> anyhow::Result<Vec<UpgradeRequest>> {
        DuckDbBackend::list_upgrade_requests(self, status).await
    }

    async fn get_upgrade_request(&self, id: i64) -> anyhow::Result<Option<UpgradeRequest>> {
        DuckDbBackend::get_upgrade_request(self, id).await
    }

    async fn update_upgrade_request(
        &self,
        id: i64,
        decision: &UpgradeDecision,
    ) -> anyhow::Result<()> {
        DuckDbBackend::update_upgrade_request(self, id, decision).await
    }

    async fn approve_upgrade_request(
        &self,
        request: &UpgradeRequest,
        approved_until: Option<&str>,
        admin_notes: Option<&str>,
    ) -> anyhow::Result<()> {
        DuckDbBackend::approve_upgrade_request(self, request, approved_until, admin_notes).await
    }

    async fn list_users(&self, limit: i64) -> anyhow::Result<Vec<User>> {
        DuckDbBackend::list_users(self, limit).await
    }

    async fn get_stats(&self, day: NaiveDate) -> anyhow::Result<DailyStats> {
        DuckDbBackend::get_stats(self, day).await
    }

    async fn get_trending_categories(
        &self,
        day: NaiveDate,
        limit: i64,
    ) -> anyhow::Result<Vec<CategoryCount>> {
        DuckDbBackend::get_trending_categories(self, day, limit).await
    }

    async fn get_totals(&self) -> anyhow::Result<Totals> {
        DuckDbBackend::get_totals(self).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        DuckDbBackend::ping(self).await
    }
}
