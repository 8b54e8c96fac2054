use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::Entitlements;
use crate::error::CoreError;
use crate::scan::usage_identity;

/// Outcome of a quota check. `reason` is empty when allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub reason: String,
    pub used: u32,
    pub limit: u32,
}

/// User-facing denial text.
pub fn quota_message(used: u32, limit: u32) -> String {
    format!(
        "You've used {used} of {limit} free checks today. Upgrade to Premium for unlimited checks."
    )
}

impl Entitlements {
    pub async fn get_daily_limit(&self, email: Option<&str>) -> Result<u32, CoreError> {
        self.get_daily_limit_at(email, Utc::now()).await
    }

    /// Anonymous callers get the free limit without touching storage.
    pub async fn get_daily_limit_at(
        &self,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<u32, CoreError> {
        match email {
            Some(email) if !email.is_empty() => {
                let plan = self.effective_plan_at(email, now).await?;
                Ok(self.limits.for_plan(plan))
            }
            _ => Ok(self.limits.free),
        }
    }

    pub async fn usage_today(&self, email: Option<&str>) -> Result<u32, CoreError> {
        self.usage_today_at(email, Utc::now()).await
    }

    /// Today's counter for the caller's usage bucket.
    pub async fn usage_today_at(
        &self,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<u32, CoreError> {
        let who = usage_identity(email);
        Ok(self.store.get_usage(who, self.usage_day(now)).await?)
    }

    pub async fn can_check(&self, email: Option<&str>) -> Result<QuotaDecision, CoreError> {
        self.can_check_at(email, Utc::now()).await
    }

    /// Allowed iff today's usage is strictly below the caller's daily limit.
    pub async fn can_check_at(
        &self,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, CoreError> {
        let limit = self.get_daily_limit_at(email, now).await?;
        let used = self.usage_today_at(email, now).await?;
        if used < limit {
            return Ok(QuotaDecision {
                allowed: true,
                reason: String::new(),
                used,
                limit,
            });
        }
        info!(who = usage_identity(email), used, limit, "Daily quota reached");
        Ok(QuotaDecision {
            allowed: false,
            reason: quota_message(used, limit),
            used,
            limit,
        })
    }
}
