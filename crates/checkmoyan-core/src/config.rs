use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub backend: StorageBackend,
    pub duckdb_memory_limit: String,
    /// Operator's reference timezone; usage counters roll over at its midnight.
    pub timezone: Tz,
    /// Shared admin password. `None` disables the admin API.
    pub admin_password: Option<String>,
    /// Argon2id memory cost (KB) used to hash the admin password at startup.
    pub argon2_memory_kb: u32,
    /// TOML file holding the `[PAYMENTS]` section.
    pub secrets_path: String,
}

/// Which storage engine backs this process. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    DuckDb,
    ClickHouse,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("CHECKMOYAN_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("CHECKMOYAN_DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string()),
            backend: {
                let raw = std::env::var("CHECKMOYAN_BACKEND")
                    .unwrap_or_else(|_| "duckdb".to_string());
                match raw.as_str() {
                    "duckdb" => StorageBackend::DuckDb,
                    "clickhouse" => StorageBackend::ClickHouse,
                    other => return Err(format!("unknown CHECKMOYAN_BACKEND: {other}")),
                }
            },
            duckdb_memory_limit: std::env::var("CHECKMOYAN_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "512MB".to_string()),
            timezone: {
                let raw = std::env::var("CHECKMOYAN_TIMEZONE")
                    .unwrap_or_else(|_| "Asia/Manila".to_string());
                raw.parse::<Tz>()
                    .map_err(|e| format!("invalid CHECKMOYAN_TIMEZONE {raw:?}: {e}"))?
            },
            admin_password: std::env::var("CHECKMOYAN_ADMIN_PASSWORD")
                .ok()
                .filter(|pw| !pw.is_empty()),
            argon2_memory_kb: std::env::var("CHECKMOYAN_ARGON2_MEMORY_KB")
                .unwrap_or_else(|_| "19456".to_string())
                .parse()
                .unwrap_or(19456),
            secrets_path: std::env::var("CHECKMOYAN_SECRETS_PATH")
                .unwrap_or_else(|_| "./.checkmoyan/secrets.toml".to_string()),
        })
    }
}
