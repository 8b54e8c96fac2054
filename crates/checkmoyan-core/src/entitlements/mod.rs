//! The entitlement engine: plan resolution, daily quotas, usage recording and
//! the manual upgrade workflow.
//!
//! [`Entitlements`] is the decision API the presentation layer calls. It holds
//! the storage backend chosen at startup, the configured daily limits and the
//! operator's reference timezone. Each public operation has an `_at` variant
//! taking an explicit instant so day boundaries can be exercised in tests.
//!
//! Two notions of "today" are in play:
//! - plan expiry is compared against the **UTC** calendar date;
//! - usage counters are keyed by the calendar date in the operator's timezone.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::payments::DailyLimits;
use crate::store::EntitlementStore;

mod quota;
mod recorder;
mod reports;
mod resolver;
mod workflow;

pub use quota::{quota_message, QuotaDecision};

pub struct Entitlements {
    store: Arc<dyn EntitlementStore>,
    limits: DailyLimits,
    timezone: Tz,
}

impl Entitlements {
    pub fn new(store: Arc<dyn EntitlementStore>, limits: DailyLimits, timezone: Tz) -> Self {
        Self {
            store,
            limits,
            timezone,
        }
    }

    pub fn limits(&self) -> DailyLimits {
        self.limits
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn store(&self) -> &Arc<dyn EntitlementStore> {
        &self.store
    }

    /// Calendar date used for plan-expiry comparisons.
    pub fn expiry_day(now: DateTime<Utc>) -> NaiveDate {
        now.date_naive()
    }

    /// Calendar date that keys the usage counter at `now`.
    pub fn usage_day(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }
}
