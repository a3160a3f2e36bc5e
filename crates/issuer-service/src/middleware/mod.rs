//! HTTP middleware for the token issuer.

pub mod http_metrics;

pub use http_metrics::http_metrics_middleware;
