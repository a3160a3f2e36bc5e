//! HTTP routes for the token issuer.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::{KeyCache, LocalTokenVerifier, TokenService};
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Issuer bound to the shared key cache.
    pub token_service: TokenService,

    /// Local verifier bound to the same cache.
    pub verifier: LocalTokenVerifier,

    /// Service configuration.
    pub config: Config,
}

impl AppState {
    /// Wire the issuer and local verifier to one key cache.
    pub fn new(config: Config, cache: Arc<KeyCache>) -> Self {
        Self {
            token_service: TokenService::from_config(Arc::clone(&cache), &config),
            verifier: LocalTokenVerifier::new(cache),
            config,
        }
    }

    pub fn cache(&self) -> &Arc<KeyCache> {
        self.token_service.cache()
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/jwk?kid=` - Single key publication
/// - `/.well-known/jwks.json` - All verifiable keys
/// - `/health` - Liveness probe
/// - `/ready` - Readiness probe (live signing keys)
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route("/jwk", get(handlers::handle_get_jwk))
        .route("/.well-known/jwks.json", get(handlers::handle_get_jwks))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TraceLayer - Log request details (innermost)
    // 2. TimeoutLayer - Timeout the request
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
