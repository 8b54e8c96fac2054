use chrono::{DateTime, Utc};
use tracing::info;

use super::Entitlements;
use crate::error::CoreError;
use crate::plan::{Plan, UserPlan};

impl Entitlements {
    /// Stored plan fields for `email`, creating the user on first sight.
    pub async fn resolve_plan(&self, email: &str) -> Result<UserPlan, CoreError> {
        self.store.ensure_user(email).await?;
        Ok(self.store.get_user_plan(email).await?)
    }

    /// The plan honoured for quota purposes right now.
    pub async fn effective_plan(&self, email: &str) -> Result<Plan, CoreError> {
        self.effective_plan_at(email, Utc::now()).await
    }

    /// Lapsed grants resolve to `Free` without rewriting the stored plan, so
    /// the admin view keeps showing the last paid plan.
    pub async fn effective_plan_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Plan, CoreError> {
        let stored = self.resolve_plan(email).await?;
        Ok(stored.effective_plan(Self::expiry_day(now)))
    }

    /// Overwrite a user's plan and expiry. Blank `premium_until` is stored as NULL.
    pub async fn set_plan(
        &self,
        email: &str,
        plan: Plan,
        premium_until: Option<&str>,
    ) -> Result<(), CoreError> {
        let premium_until = premium_until.map(str::trim).filter(|s| !s.is_empty());
        self.store.ensure_user(email).await?;
        self.store.set_user_plan(email, plan, premium_until).await?;
        info!(email, plan = %plan, premium_until, "User plan set");
        Ok(())
    }
}
