use chrono::Utc;

use super::Entitlements;
use crate::error::CoreError;
use crate::plan::User;
use crate::scan::{CategoryCount, DailyStats, Totals};

impl Entitlements {
    pub async fn stats_today(&self) -> Result<DailyStats, CoreError> {
        Ok(self.store.get_stats(self.usage_day(Utc::now())).await?)
    }

    pub async fn trending_today(&self, limit: i64) -> Result<Vec<CategoryCount>, CoreError> {
        Ok(self
            .store
            .get_trending_categories(self.usage_day(Utc::now()), limit)
            .await?)
    }

    pub async fn list_users(&self, limit: i64) -> Result<Vec<User>, CoreError> {
        Ok(self.store.list_users(limit).await?)
    }

    pub async fn totals(&self) -> Result<Totals, CoreError> {
        Ok(self.store.get_totals().await?)
    }
}
