//! Metrics definitions for the remote verifier
//!
//! The embedding service installs the recorder; without one these calls are
//! no-ops.
//!
//! # Cardinality
//!
//! - `status`: success, not_found, decode_error, error
//! - `result`: hit, miss
//! - `outcome`: valid, rejected, malformed, fetch_failed, decode_failed

use common::error::TokenError;
use common::jwt::Claims;
use metrics::{counter, histogram};
use std::time::Duration;

/// Record one HTTP key fetch
///
/// Metric: `verifier_jwk_fetch_total`, `verifier_jwk_fetch_duration_seconds`
/// Labels: `status`
pub fn record_jwk_fetch(status: &str, duration: Duration) {
    histogram!("verifier_jwk_fetch_duration_seconds").record(duration.as_secs_f64());

    counter!("verifier_jwk_fetch_total", "status" => status.to_string()).increment(1);
}

/// Metric: `verifier_jwk_cache_total`
/// Labels: `result`
pub fn record_jwk_cache(result: &str) {
    counter!("verifier_jwk_cache_total", "result" => result.to_string()).increment(1);
}

/// Metric: `verifier_token_verifications_total`
/// Labels: `outcome`
pub fn record_token_verification(result: &Result<Option<Claims>, TokenError>) {
    counter!("verifier_token_verifications_total", "outcome" => outcome(result)).increment(1);
}

fn outcome(result: &Result<Option<Claims>, TokenError>) -> &'static str {
    match result {
        Ok(Some(_)) => "valid",
        Ok(None) => "rejected",
        Err(TokenError::MalformedToken(_)) => "malformed",
        Err(TokenError::KeyFetchFailed(_)) => "fetch_failed",
        Err(TokenError::KeyDecodeFailed(_)) => "decode_failed",
    }
}
