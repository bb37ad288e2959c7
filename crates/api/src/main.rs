//! OpCal - operations calendar service
//!
//! Loads configuration, starts the owner sync scheduler and runs until
//! Ctrl-C.

use anyhow::Context;
use opcal_lib::utils::{error_label, init_tracing};
use opcal_lib::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before configuration so OPCAL_* variables are visible
    let dotenv = dotenvy::dotenv();

    let config = opcal_infra::load_config().context("failed to load configuration")?;
    init_tracing(&config.logging)?;

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded .env"),
        Err(err) => tracing::debug!(error = %err, "no .env file loaded"),
    }
    tracing::info!(
        database = %config.database.path,
        esi = %config.remote.base_url,
        sync_enabled = config.sync.enabled,
        cron = %config.sync.cron_expression,
        "OpCal starting"
    );

    let ctx = AppContext::new_with_config(config).await.map_err(|err| {
        tracing::error!(error = %err, kind = error_label(&err), "startup failed");
        err
    })?;

    let health = ctx.health_check()?;
    tracing::info!(
        connections = health.connections,
        max_connections = health.max_connections,
        "database pool healthy"
    );

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    tracing::info!("shutdown requested");

    ctx.shutdown().await?;
    Ok(())
}
