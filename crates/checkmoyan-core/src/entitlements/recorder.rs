use chrono::{DateTime, Utc};
use tracing::debug;

use super::Entitlements;
use crate::error::CoreError;
use crate::scan::{usage_identity, NewScan, ScanOutcome};

impl Entitlements {
    pub async fn record_check(
        &self,
        email: Option<&str>,
        outcome: &ScanOutcome,
    ) -> Result<i64, CoreError> {
        self.record_check_at(email, outcome, Utc::now()).await
    }

    /// Count one scan against today's quota and append its outcome.
    ///
    /// Does not consult the counter: callers run [`Entitlements::can_check`]
    /// before scanning. Returns the new scan id.
    pub async fn record_check_at(
        &self,
        email: Option<&str>,
        outcome: &ScanOutcome,
        now: DateTime<Utc>,
    ) -> Result<i64, CoreError> {
        let who = usage_identity(email);
        let day = self.usage_day(now);
        let scan = NewScan::from_outcome(who, day, outcome)?;

        self.store.record_usage(who, day).await?;
        let scan_id = self.store.insert_scan(&scan).await?;
        debug!(who, scan_id, verdict = %scan.verdict, "Scan recorded");
        Ok(scan_id)
    }
}
