use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Usage bucket for callers that supply no identifier.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Map an optional/empty caller identifier onto its usage bucket.
pub fn usage_identity(email: Option<&str>) -> &str {
    match email {
        Some(e) if !e.is_empty() => e,
        _ => ANONYMOUS_USER,
    }
}

/// What the scan pipeline produced for one message.
///
/// The raw message is never part of this struct; only its fingerprint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub verdict: String,
    pub confidence: i32,
    pub category: Option<String>,
    pub signals: Option<Vec<String>>,
    pub content_fingerprint: Option<String>,
}

/// A scan row ready for insertion. Every optional field is already normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScan {
    pub email: String,
    /// Usage day the scan counts against, in the operator's timezone.
    pub day: NaiveDate,
    pub verdict: String,
    pub confidence: i32,
    pub category: String,
    /// JSON array of signal tags, `"[]"` when none were reported.
    pub signals: String,
    pub content_fingerprint: String,
}

impl NewScan {
    pub fn from_outcome(
        email: &str,
        day: NaiveDate,
        outcome: &ScanOutcome,
    ) -> Result<Self, serde_json::Error> {
        let signals = match &outcome.signals {
            Some(tags) => serde_json::to_string(tags)?,
            None => "[]".to_string(),
        };
        Ok(Self {
            email: email.to_string(),
            day,
            verdict: outcome.verdict.clone(),
            confidence: outcome.confidence,
            category: outcome.category.clone().unwrap_or_default(),
            signals,
            content_fingerprint: outcome.content_fingerprint.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    pub day: String,
    pub scans: i64,
    pub unique_users: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total_scans: i64,
    pub total_users: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap_or_default()
    }

    #[test]
    fn empty_identity_uses_anonymous_bucket() {
        assert_eq!(usage_identity(None), ANONYMOUS_USER);
        assert_eq!(usage_identity(Some("")), ANONYMOUS_USER);
        assert_eq!(usage_identity(Some("a@b.ph")), "a@b.ph");
    }

    #[test]
    fn missing_fields_are_normalised() {
        let outcome = ScanOutcome {
            verdict: "likely_scam".to_string(),
            confidence: 87,
            ..Default::default()
        };
        let scan = NewScan::from_outcome("anonymous", day(), &outcome).expect("normalise");
        assert_eq!(scan.category, "");
        assert_eq!(scan.signals, "[]");
        assert_eq!(scan.content_fingerprint, "");
    }

    #[test]
    fn signals_are_serialised_as_json_list() {
        let outcome = ScanOutcome {
            verdict: "suspicious".to_string(),
            confidence: 60,
            category: Some("phishing".to_string()),
            signals: Some(vec!["urgency".to_string(), "short_link".to_string()]),
            content_fingerprint: Some("ab12".to_string()),
        };
        let scan = NewScan::from_outcome("a@b.ph", day(), &outcome).expect("normalise");
        assert_eq!(scan.signals, r#"["urgency","short_link"]"#);
        assert_eq!(scan.category, "phishing");
    }
}
