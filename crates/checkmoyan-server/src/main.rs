use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use checkmoyan_core::{
    config::{Config, StorageBackend},
    payments::PaymentConfig,
    store::EntitlementStore,
};
use checkmoyan_server::state::AppState;

/// `checkmoyan health`: liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$CHECKMOYAN_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("CHECKMOYAN_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

async fn open_store(cfg: &Config) -> Result<Arc<dyn EntitlementStore>> {
    match cfg.backend {
        StorageBackend::DuckDb => {
            std::fs::create_dir_all(&cfg.data_dir)?;
            let db_path = format!("{}/checkmoyan.db", cfg.data_dir);
            let db = checkmoyan_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;
            Ok(Arc::new(db))
        }
        #[cfg(feature = "cloud")]
        StorageBackend::ClickHouse => {
            let cloud = checkmoyan_server::cloud::CloudConfig::from_env()
                .map_err(|e| anyhow::anyhow!(e))?;
            let store = checkmoyan_server::cloud::connect(&cloud).await?;
            info!(url = %cloud.clickhouse_url, "ClickHouse backend ready");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "cloud"))]
        StorageBackend::ClickHouse => Err(anyhow::anyhow!(
            "CHECKMOYAN_BACKEND=clickhouse requires a build with --features cloud"
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }
    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("checkmoyan=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let payments = PaymentConfig::load(&cfg.secrets_path);
    info!(
        free_daily_limit = payments.free_daily_limit,
        premium_daily_limit = payments.premium_daily_limit,
        timezone = %cfg.timezone,
        "Entitlement limits loaded"
    );
    if cfg.admin_password.is_none() {
        warn!("CHECKMOYAN_ADMIN_PASSWORD not set; admin API disabled");
    }

    let store = open_store(&cfg).await?;
    let state = Arc::new(AppState::new(store, cfg.clone(), payments)?);

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = checkmoyan_server::app::build_app(Arc::clone(&state));

    info!(port = cfg.port, backend = ?cfg.backend, "CheckMoYan listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
