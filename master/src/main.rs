mod config;
mod handlers;
mod monitor;
mod state;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::MasterConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("master=debug,common=debug,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = MasterConfig::from_env()?;
    info!(
        "config: addr={} poll_interval={:?} max_filter_ratio={} file_server_base={}",
        config.addr, config.poll_interval, config.max_filter_ratio, config.file_server_base
    );

    let state = AppState::new(config);

    // router HTTP
    let app = handlers::build_router(state.clone());

    // supervisor de ETL en segundo plano
    let monitor_state = state.clone();
    tokio::spawn(async move {
        monitor::run_etl_poll_loop(monitor_state).await;
    });

    let listener = TcpListener::bind(&state.config.addr)
        .await
        .with_context(|| format!("no se pudo escuchar en {}", state.config.addr))?;
    info!("master escuchando en {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
