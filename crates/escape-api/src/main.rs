//! Escape API Server
//!
//! Admin content API with stateless bearer-token authentication.

use anyhow::Context;
use escape_api::{create_router, state::AppState};
use escape_core::{AppConfig, LoggingConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(logging: &LoggingConfig) {
    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("escape_api={0},escape_core={0},tower_http=info", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    tracing::info!(environment = ?config.environment, "starting escape-api");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(
        AppState::from_config(config)
            .await
            .context("failed to initialize application state")?,
    );

    state
        .bootstrap_admin()
        .await
        .context("failed to provision the admin account")?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Escape API listening on http://{}/api/v1", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
