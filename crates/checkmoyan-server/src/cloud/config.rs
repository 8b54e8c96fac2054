/// Connection settings for the ClickHouse backend.
///
/// Loaded once at startup, before any port is bound. A missing variable is a
/// startup error naming that variable.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub clickhouse_url: String,
    pub clickhouse_user: String,
    pub clickhouse_password: String,
}

impl CloudConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let require = |name: &'static str| -> Result<String, String> {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| format!("{name} is required when CHECKMOYAN_BACKEND=clickhouse"))
        };

        Ok(Self {
            clickhouse_url: require("CLICKHOUSE_URL")?,
            clickhouse_user: require("CLICKHOUSE_USER")?,
            clickhouse_password: require("CLICKHOUSE_PASSWORD")?,
        })
    }
}
