//! Charity fund service entry point.
//!
//! Loads configuration, opens the SQLite ledger, and serves the REST API.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use charity_fund::api::{self, ApiState};
use charity_fund::config::Config;
use charity_fund::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    info!(
        "{} starting (allocation policy: {:?})",
        config.app_title, config.allocation_policy
    );

    let pool = db::init_pool(&config.database_url).await?;

    let addr = format!("0.0.0.0:{}", config.api_port);
    let app = api::router(Arc::new(ApiState::new(pool, config)));

    info!("API listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
