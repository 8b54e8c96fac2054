//! ClickHouse warehouse backend for hosted deployments (`CHECKMOYAN_BACKEND=clickhouse`).

pub mod clickhouse;
pub mod config;

use anyhow::Result;

pub use clickhouse::{ClickHouseClient, ClickHouseStore};
pub use config::CloudConfig;

/// Connect with `cfg`, apply the schema and return a ready store.
pub async fn connect(cfg: &CloudConfig) -> Result<ClickHouseStore> {
    let client = ClickHouseClient::new(
        &cfg.clickhouse_url,
        &cfg.clickhouse_user,
        &cfg.clickhouse_password,
    );
    clickhouse::clickhouse_migrate(&client).await?;
    Ok(ClickHouseStore::new(client))
}
