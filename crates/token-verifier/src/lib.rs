//! Remote Token Verifier Library
//!
//! Verification-only peer of the token issuer. Public keys are fetched one
//! `kid` at a time from the issuer's key publication endpoint, rebuilt from
//! the JWK `x` coordinate, and cached for a configurable TTL. Verification
//! itself is the shared algorithm in `common::verifier`.
//!
//! # Modules
//!
//! - `config` - Endpoint, timeout and cache settings
//! - `errors` - Error types
//! - `jwk_client` - Fetching and caching published keys
//! - `observability` - Metrics
//! - `remote_verifier` - `RemoteKeyResolver` and `RemoteTokenVerifier`

pub mod config;
pub mod errors;
pub mod jwk_client;
pub mod observability;
pub mod remote_verifier;

pub use jwk_client::JwkClient;
pub use remote_verifier::{RemoteKeyResolver, RemoteTokenVerifier};
