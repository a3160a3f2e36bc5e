//! Token Issuer
//!
//! Serves the public half of its self-rotating Ed25519 signing keys so that
//! remote verifiers can check the tokens this process mints.

use issuer_service::config::Config;
use issuer_service::observability::metrics::init_metrics_recorder;
use issuer_service::routes::{self, AppState};
use issuer_service::services::KeyCache;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "issuer_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Token Issuer");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        key_pair_lifetime_seconds = config.key_pair_lifetime_seconds,
        token_lifetime_seconds = config.token_lifetime_seconds,
        min_live_keys = config.min_live_keys,
        "Configuration loaded successfully"
    );

    // Metrics recorder must be installed before the first key is generated
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    // Warm the key cache
    let cache = Arc::new(KeyCache::from_config(&config));
    let generated = cache.ensure_warm().await.map_err(|e| {
        error!("Failed to generate signing keys: {}", e);
        e
    })?;

    info!(generated, "Signing keys initialized");

    // Parse bind address before moving config
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState::new(config, cache));
    let app = routes::build_routes(state, metrics_handle);

    info!("Token Issuer listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Token Issuer shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
