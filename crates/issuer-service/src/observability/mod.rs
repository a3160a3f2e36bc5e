//! Observability module for the token issuer
//!
//! # Privacy by Default
//!
//! All instrumentation uses `#[instrument(skip_all)]` and explicit safe field allow-listing.
//! Fields are categorized as:
//! - **SAFE**: Can be logged in plaintext (key IDs, tenant IDs, outcomes)
//! - **HASHED**: Must be SHA-256 hashed for correlation (subject)
//! - **NEVER**: Must never appear in logs (tokens, private keys, signatures)

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// Used for the token subject, which needs correlation across log entries but
/// should not be stored in plaintext.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    // 32 bits: enough for correlation, limits reversibility
    hex::encode(digest.get(..4).unwrap_or_default())
}
