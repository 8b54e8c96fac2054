use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::plan::Plan;

/// Lifecycle of a manual-payment upgrade request.
///
/// `Pending` is the only non-terminal state. Transitions are
/// `Pending -> Approved` and `Pending -> Rejected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl UpgradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeStatus::Pending => "pending",
            UpgradeStatus::Approved => "approved",
            UpgradeStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, UpgradeStatus::Pending)
    }
}

impl fmt::Display for UpgradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpgradeStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(UpgradeStatus::Pending),
            "approved" => Ok(UpgradeStatus::Approved),
            "rejected" => Ok(UpgradeStatus::Rejected),
            _ => Err(CoreError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeRequest {
    pub id: i64,
    pub email: String,
    pub plan: Plan,
    /// Payment channel, e.g. `"gcash"` or `"maya"`.
    pub method: String,
    #[serde(rename = "ref")]
    pub payment_ref: Option<String>,
    pub receipt_path: Option<String>,
    pub status: UpgradeStatus,
    pub admin_notes: Option<String>,
    pub approved_until: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUpgradeRequest {
    pub email: String,
    pub plan: Plan,
    pub method: String,
    #[serde(default, rename = "ref")]
    pub payment_ref: Option<String>,
    #[serde(default)]
    pub receipt_path: Option<String>,
}

/// Fields written by an administrator's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeDecision {
    pub status: UpgradeStatus,
    pub admin_notes: Option<String>,
    pub approved_until: Option<String>,
}
