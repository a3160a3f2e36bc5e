//! Token Issuer Service Library
//!
//! Self-rotating Ed25519 signing keys and the issuing side of the compact
//! token protocol. The same process can verify its own tokens locally and
//! publishes the public half of every key pair for remote verifiers.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Key generation and signing
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `models` - Response models
//! - `observability` - Metrics and log field hashing
//! - `routes` - Router construction
//! - `services` - Key rotation cache, issuer, local verifier

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
