//! API server binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tscout_api::{routes, ApiConfig, AppState};

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

    info!("starting tscout-api");

    let config = ApiConfig::from_env();
    let addr = format!("{}:{}", config.host, config.port);

    let metrics_handle = tscout_api::metrics::install_recorder();

    let state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("failed to build app state: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = state.queue.init().await {
        error!("failed to initialize queue: {e}");
        std::process::exit(1);
    }

    let router = routes::create_router(state, metrics_handle);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!("listening on {addr}");

    if let Err(e) = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    {
        error!("server error: {e}");
        std::process::exit(1);
    }
}
