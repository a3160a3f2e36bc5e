//! HTTP request handlers for the token issuer.

pub mod health;
pub mod jwk_handler;
pub mod metrics;

pub use health::{health_check, readiness_check};
pub use jwk_handler::{handle_get_jwk, handle_get_jwks};
pub use metrics::metrics_handler;
