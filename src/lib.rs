pub mod models;
pub mod modules;
pub mod proxy;

use anyhow::Context;
use tracing::info;

/// Process entry point: `.env`, logging, config, then serve until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    // A missing .env is normal outside development
    let _ = dotenv::dotenv();

    let config = modules::load_gateway_config().context("failed to load configuration")?;
    let _log_guard = modules::init_logger(config.log_dir.as_deref().map(std::path::Path::new));

    info!("Starting ReadyPulse Gateway v{}", env!("CARGO_PKG_VERSION"));

    let (server, handle) = proxy::GatewayServer::start(&config)
        .await
        .context("failed to start gateway server")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    server.stop().await;
    handle.await.context("server task panicked")?;
    Ok(())
}
