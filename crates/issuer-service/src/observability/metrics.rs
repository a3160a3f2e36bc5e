//! Metrics definitions for the token issuer
//!
//! All metrics follow Prometheus naming conventions:
//! - `issuer_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: success, error (issuance); success, not_found, bad_request (JWK)
//! - `outcome`: valid, rejected, malformed, error
//! - `endpoint`: the fixed route set plus `/other`

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle used by `/metrics`.
///
/// # Errors
///
/// Returns error if a recorder is already installed in this process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("issuer_http_request".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Signing is sub-millisecond unless a key pair has to be generated
        .set_buckets_for_metric(
            Matcher::Full("issuer_token_issuance_duration_seconds".to_string()),
            &[0.0001, 0.0005, 0.001, 0.002, 0.005, 0.010, 0.050, 0.100],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token issuance duration and outcome
///
/// Metric: `issuer_token_issuance_duration_seconds`, `issuer_token_issuance_total`
/// Labels: `status`
pub fn record_token_issuance(status: &str, duration: Duration) {
    histogram!("issuer_token_issuance_duration_seconds").record(duration.as_secs_f64());

    counter!("issuer_token_issuance_total", "status" => status.to_string()).increment(1);
}

/// Record a local verification result
///
/// Metric: `issuer_token_verifications_total`
/// Labels: `outcome`
pub fn record_token_verification(outcome: &str) {
    counter!("issuer_token_verifications_total", "outcome" => outcome.to_string()).increment(1);
}

// ============================================================================
// Key Rotation Metrics
// ============================================================================

/// Metric: `issuer_keys_generated_total`
pub fn record_keys_generated(count: usize) {
    counter!("issuer_keys_generated_total").increment(count as u64);
}

/// Metric: `issuer_keys_evicted_total`
pub fn record_keys_evicted(count: usize) {
    counter!("issuer_keys_evicted_total").increment(count as u64);
}

/// Number of key pairs that may currently sign
///
/// Metric: `issuer_live_signing_keys`
#[allow(clippy::cast_precision_loss)]
pub fn set_live_signing_keys(count: usize) {
    gauge!("issuer_live_signing_keys").set(count as f64);
}

// ============================================================================
// JWK Metrics
// ============================================================================

/// Record a key publication request
///
/// Metric: `issuer_jwk_requests_total`
/// Labels: `status`
pub fn record_jwk_request(status: &str) {
    counter!("issuer_jwk_requests_total", "status" => status.to_string()).increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `issuer_http_requests_total`, `issuer_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status_code`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let endpoint = normalize_endpoint(path);

    histogram!("issuer_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint
    )
    .record(duration.as_secs_f64());

    counter!("issuer_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/jwk" => "/jwk",
        "/.well-known/jwks.json" => "/.well-known/jwks.json",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}
