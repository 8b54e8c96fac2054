use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Wire and storage format for `premium_until` / `approved_until`.
pub const PLAN_DATE_FORMAT: &str = "%Y-%m-%d";

/// A subscription tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Premium,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Premium => "premium",
            Plan::Pro => "pro",
        }
    }

    /// Premium and pro share the premium daily limit.
    pub fn is_paid(&self) -> bool {
        matches!(self, Plan::Premium | Plan::Pro)
    }

    /// Lenient decoding of a stored plan column.
    ///
    /// Rows written by older tooling may carry mixed case or an empty value;
    /// anything unrecognised is read as `Free`.
    pub fn from_stored(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "premium" => Ok(Plan::Premium),
            "pro" => Ok(Plan::Pro),
            _ => Err(CoreError::InvalidPlan(s.to_string())),
        }
    }
}

/// Parse a `YYYY-MM-DD` plan date. Surrounding whitespace is ignored.
pub fn parse_plan_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), PLAN_DATE_FORMAT).ok()
}

/// The stored plan fields of a user.
///
/// `premium_until` is kept as the text the operator entered. A malformed
/// value is not rejected on write; [`UserPlan::effective_plan`] treats it as
/// an expired grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPlan {
    pub plan: Plan,
    pub premium_until: Option<String>,
}

impl UserPlan {
    /// The plan honoured for quota purposes on `today` (a UTC calendar date).
    ///
    /// - paid plan, no expiry: non-expiring grant, honoured as-is;
    /// - paid plan, expiry on or after `today`: honoured;
    /// - paid plan, expiry in the past or unparsable: `Free`.
    ///
    /// The stored value is never rewritten here.
    pub fn effective_plan(&self, today: NaiveDate) -> Plan {
        if !self.plan.is_paid() {
            return Plan::Free;
        }
        match self.premium_until.as_deref().map(str::trim) {
            None | Some("") => self.plan,
            Some(raw) => match parse_plan_date(raw) {
                Some(until) if until >= today => self.plan,
                _ => Plan::Free,
            },
        }
    }
}

/// A user row as listed in the admin view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub email: String,
    pub plan: Plan,
    pub premium_until: Option<String>,
    pub created_at: String,
}
