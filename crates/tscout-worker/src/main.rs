//! Pipeline worker binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tscout_worker::{JobExecutor, WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("tscout=info".parse().unwrap()))
        .init();

    info!("starting tscout-worker");

    let config = WorkerConfig::from_env();
    info!("worker config: {:?}", config);

    let ctx = match WorkerContext::from_env(config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("failed to build worker context: {e}");
            std::process::exit(1);
        }
    };

    let executor = JobExecutor::new(ctx);

    let shutdown_handle = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
    });

    if let Err(e) = executor.run().await {
        error!("executor error: {e}");
        std::process::exit(1);
    }

    shutdown_handle.await.ok();
    info!("worker shutdown complete");
}
