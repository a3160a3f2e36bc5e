//! Observability module for the remote verifier
//!
//! Key fetch logging uses `kid` only. Tokens and claims never reach log
//! fields or metric labels.

pub mod metrics;
