mod dto;
mod error;
mod handlers;
mod jobs;
mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use casebook_core::CasebookConfig;
use tracing::info;

use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .compact()
        .init();

    let config_path = std::env::var("CASEBOOK_CONFIG").ok().map(PathBuf::from);
    let config = CasebookConfig::load(config_path.as_deref())?;
    let addr = config.server.addr();

    let state = Arc::new(AppState::new(config)?);
    if let Some(path) = state.store.db_path() {
        info!("Case store at {}", path.display());
    }

    let app = routes::router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
