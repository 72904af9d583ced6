use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use log::info;
use std::sync::Arc;

use crmserver::core::config::AppConfig;
use crmserver::core::shared::state::AppState;
use crmserver::core::shared::utils::{create_conn, run_migrations};
use crmserver::main_module::run_axum_server;
use crmserver::reports::{PgLeadStore, ReportsService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    info!(
        "Starting crmserver {} on {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.server.host,
        config.server.port
    );

    let pool = create_conn(&config.database.url, config.database.pool_size)
        .context("Failed to create database pool")?;
    run_migrations(&pool).map_err(|e| anyhow!("Failed to run migrations: {e}"))?;

    let store = Arc::new(PgLeadStore::new(pool.clone()));
    let reports = Arc::new(ReportsService::new(
        store,
        config.reports.forecast_weights,
    ));
    let app_state = Arc::new(AppState::new(pool, config, reports));

    run_axum_server(app_state)
        .await
        .context("HTTP server failed")?;

    info!("crmserver stopped");
    Ok(())
}
