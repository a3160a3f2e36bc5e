//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - the key cache holds enough live signing keys

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check the key cache. Failure means the process is hung.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Tops the key cache up first, so a service that has been idle for longer
/// than a key lifetime still reports ready. Returns 503 if the cache cannot
/// reach `min_live_keys`.
#[tracing::instrument(skip_all, name = "issuer.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cache = state.cache();
    let now = chrono::Utc::now().timestamp();

    if let Err(e) = cache.ensure_warm_at(now).await {
        tracing::warn!(target: "issuer.keys", error = %e, "Readiness check failed: key generation error");
    }

    let live_signing_keys = cache.live_count_at(now).await;
    let min_live_keys = cache.min_live_keys();
    let ready = min_live_keys > 0 && live_signing_keys >= min_live_keys;

    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        tracing::warn!(
            target: "issuer.keys",
            live_signing_keys,
            min_live_keys,
            "Readiness check failed: not enough live signing keys"
        );
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        status,
        Json(ReadinessResponse {
            status: label.to_string(),
            live_signing_keys,
            min_live_keys,
        }),
    )
}
