//! Token protocol shared by the issuer and by verification-only peers.
//!
//! Nothing in this crate holds private key material: it defines the compact
//! token wire format, the published JWK record with its curve-point codec,
//! and the single verification algorithm both trust domains run.

#![warn(clippy::pedantic)]

/// Module for token protocol error types
pub mod error;

/// Module for the compact token wire format (segments, header, claims)
pub mod jwt;

/// Module for published public keys (JWK records, Ed25519 point codec)
pub mod jwk;

/// Module for the verification algorithm and the key resolver seam
pub mod verifier;
