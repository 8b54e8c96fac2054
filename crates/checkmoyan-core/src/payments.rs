//! Payment contacts, plan pricing and daily limits from the operator's
//! secrets file.
//!
//! Operators have written the `[PAYMENTS]` section in several equivalent
//! shapes over time (nested tables, flat keys, upper-case env-style keys,
//! top-level `PAYMENTS_*` keys). [`PaymentConfig::from_value`] folds all of
//! them into one fully-defaulted struct and never fails.

use std::path::Path;

use serde::Serialize;
use toml::Value;
use tracing::warn;

use crate::plan::Plan;

pub const DEFAULT_FREE_DAILY_LIMIT: u32 = 2;
pub const DEFAULT_PREMIUM_DAILY_LIMIT: u32 = 9999;
pub const DEFAULT_PREMIUM_PRICE: u32 = 199;
pub const DEFAULT_PRO_PRICE: u32 = 999;
pub const DEFAULT_PREMIUM_BILLING: &str = "Month";
pub const DEFAULT_PRO_BILLING: &str = "monthly";

/// Per-tier daily scan limits. `premium` applies to both premium and pro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyLimits {
    pub free: u32,
    pub premium: u32,
}

impl Default for DailyLimits {
    fn default() -> Self {
        Self {
            free: DEFAULT_FREE_DAILY_LIMIT,
            premium: DEFAULT_PREMIUM_DAILY_LIMIT,
        }
    }
}

impl DailyLimits {
    pub fn for_plan(&self, effective: Plan) -> u32 {
        if effective.is_paid() {
            self.premium
        } else {
            self.free
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentConfig {
    pub gcash_number: String,
    pub gcash_name: String,
    pub maya_number: String,
    pub maya_name: String,
    /// Price in PHP.
    pub premium_price: u32,
    pub premium_billing: String,
    pub pro_price: u32,
    pub pro_billing: String,
    pub free_daily_limit: u32,
    pub premium_daily_limit: u32,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self::from_value(&Value::Table(Default::default()))
    }
}

/// One entry of the public pricing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanOffer {
    pub key: Plan,
    pub name: String,
    pub price_php: u32,
    pub billing: String,
    pub features: Vec<String>,
}

impl PaymentConfig {
    /// Read and normalise a TOML secrets file.
    ///
    /// A missing or unparsable file yields all defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Secrets file unreadable; using payment defaults");
                return Self::default();
            }
        };
        match raw.parse::<toml::Table>() {
            Ok(table) => Self::from_value(&Value::Table(table)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Secrets file is not valid TOML; using payment defaults");
                Self::default()
            }
        }
    }

    /// Normalise the whole secrets document (the root table, not just
    /// `[PAYMENTS]`, since some layouts put `PAYMENTS_*` keys at the top level).
    pub fn from_value(root: &Value) -> Self {
        let payments = root.get("PAYMENTS").filter(|v| v.is_table());

        let (gcash_number, gcash_name) = contact(root, payments, "gcash");
        let (maya_number, maya_name) = contact(root, payments, "maya");

        let plans = payments.and_then(|p| p.get("plans")).filter(|v| v.is_table());
        let (premium_price, premium_billing) = pricing(
            payments,
            plans,
            "premium",
            DEFAULT_PREMIUM_PRICE,
            DEFAULT_PREMIUM_BILLING,
        );
        let (pro_price, pro_billing) =
            pricing(payments, plans, "pro", DEFAULT_PRO_PRICE, DEFAULT_PRO_BILLING);

        Self {
            gcash_number,
            gcash_name,
            maya_number,
            maya_name,
            premium_price,
            premium_billing,
            pro_price,
            pro_billing,
            free_daily_limit: limit(root, payments, "free_daily_limit", DEFAULT_FREE_DAILY_LIMIT),
            premium_daily_limit: limit(
                root,
                payments,
                "premium_daily_limit",
                DEFAULT_PREMIUM_DAILY_LIMIT,
            ),
        }
    }

    pub fn limits(&self) -> DailyLimits {
        DailyLimits {
            free: self.free_daily_limit,
            premium: self.premium_daily_limit,
        }
    }

    /// The three offers shown on the pricing page.
    pub fn plans(&self) -> Vec<PlanOffer> {
        vec![
            PlanOffer {
                key: Plan::Free,
                name: "Free".to_string(),
                price_php: 0,
                billing: String::new(),
                features: vec![
                    format!("{} checks per day", self.free_daily_limit),
                    "Basic verdict & reasons".to_string(),
                    "Shareable warning text".to_string(),
                    "No screenshot upload".to_string(),
                ],
            },
            PlanOffer {
                key: Plan::Premium,
                name: "Premium".to_string(),
                price_php: self.premium_price,
                billing: self.premium_billing.clone(),
                features: vec![
                    "Unlimited checks".to_string(),
                    "Advanced explainers".to_string(),
                    "Priority support".to_string(),
                ],
            },
            PlanOffer {
                key: Plan::Pro,
                name: "Pro".to_string(),
                price_php: self.pro_price,
                billing: self.pro_billing.clone(),
                features: vec![
                    "Everything in Premium".to_string(),
                    "Priority verification".to_string(),
                    "Bulk check (coming soon)".to_string(),
                    "Dedicated support".to_string(),
                ],
            },
        ]
    }
}

/// Scalar as trimmed text. Numbers are accepted since phone numbers are often
/// written unquoted.
fn text(v: Option<&Value>) -> Option<String> {
    let s = match v? {
        Value::String(s) => s.trim().to_string(),
        Value::Integer(i) => i.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// `(number, name)` for a payment channel.
///
/// Lookup order: `[PAYMENTS.<channel>]` table, flat `<channel>_number` /
/// `<CHANNEL>_NUMBER` under `[PAYMENTS]`, then top-level `PAYMENTS_<CHANNEL>_NUMBER`
/// and dotted `"PAYMENTS.<channel>_number"` keys.
fn contact(root: &Value, payments: Option<&Value>, channel: &str) -> (String, String) {
    let field = |name: &str| -> String {
        let nested = payments
            .and_then(|p| p.get(channel))
            .filter(|v| v.is_table())
            .and_then(|t| text(t.get(name)));
        let flat_key = format!("{channel}_{name}");
        let flat = || {
            payments.and_then(|p| {
                text(p.get(flat_key.as_str()))
                    .or_else(|| text(p.get(flat_key.to_ascii_uppercase().as_str())))
            })
        };
        let top_level = || {
            text(root.get(format!("PAYMENTS_{}", flat_key.to_ascii_uppercase()).as_str()))
                .or_else(|| text(root.get(format!("PAYMENTS.{flat_key}").as_str())))
                .or_else(|| {
                    root.get(format!("PAYMENTS.{channel}").as_str())
                        .and_then(|t| text(t.get(name)))
                })
        };
        nested.or_else(flat).or_else(top_level).unwrap_or_default()
    };
    (field("number"), field("name"))
}

/// `(price, billing)` for a paid plan, from `[PAYMENTS.plans.<plan>]` when
/// present, else flat `<plan>_price_php` / `<plan>_price` / `<plan>_billing`.
fn pricing(
    payments: Option<&Value>,
    plans: Option<&Value>,
    plan: &str,
    default_price: u32,
    default_billing: &str,
) -> (u32, String) {
    if let Some(table) = plans.and_then(|p| p.get(plan)).filter(|v| v.is_table()) {
        let price = table.get("price_php").and_then(number).unwrap_or(default_price);
        let billing = text(table.get("billing")).unwrap_or_else(|| default_billing.to_string());
        return (price, billing);
    }
    let flat = |key: String| payments.and_then(|p| p.get(key.as_str()));
    let price = flat(format!("{plan}_price_php"))
        .or_else(|| flat(format!("{plan}_price")))
        .and_then(number)
        .unwrap_or(default_price);
    let billing = text(flat(format!("{plan}_billing")))
        .unwrap_or_else(|| default_billing.to_string());
    (price, billing)
}

/// A daily limit from `PAYMENTS.<key>`, else top-level `PAYMENTS_<key>`.
///
/// Zero, empty, negative and non-numeric values fall through to the next
/// source and finally to `default`.
fn limit(root: &Value, payments: Option<&Value>, key: &str, default: u32) -> u32 {
    payments
        .and_then(|p| p.get(key))
        .and_then(number)
        .or_else(|| root.get(format!("PAYMENTS_{key}").as_str()).and_then(number))
        .unwrap_or(default)
}

/// Positive integer from an integer, float or numeric string.
fn number(v: &Value) -> Option<u32> {
    let n = match v {
        Value::Integer(i) => *i,
        Value::Float(f) if f.is_finite() => f.trunc() as i64,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok().filter(|n| *n > 0)
}
