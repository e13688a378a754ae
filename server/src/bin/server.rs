//! Synthia server binary.
//!
//! Periodic work (token refresh, queue processing) is driven by an external
//! scheduler hitting the cron endpoints; nothing here runs on a timer.

use tracing_subscriber::EnvFilter;

use synthia_lib::app::SharedState;
use synthia_lib::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,synthia_lib=debug,tower_http=info")),
        )
        .init();

    tracing::info!("Starting Synthia server");

    let (db, config, dir) = synthia_lib::init_foundation()?;
    let state = SharedState::new(db, config, dir);

    let server_state = state.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::start_server(server_state).await {
            tracing::error!("Server failed: {e}");
        }
    });

    tracing::info!(port = state.server_port(), "Server running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    state.shutdown_token().cancel();
    if let Err(e) = server_handle.await {
        tracing::error!("Server task ended abnormally: {e}");
    }
    Ok(())
}
