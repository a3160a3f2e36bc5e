//! # Issuer Test Utilities
//!
//! Shared test utilities for the token issuer and its verifiers.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed Ed25519 keys from fixed seeds)
//! - Token builders for crafted, tampered and expired tokens
//! - Server test harness (TestIssuerServer for E2E tests)
//! - Fixed test IDs and claim values
//! - Custom assertions (TokenAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use issuer_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let key = test_signing_key(1)?;
//!
//!     let token = TestTokenBuilder::new()
//!         .for_subject(TEST_SUBJECT_ALICE)
//!         .with_scope("read write")
//!         .sign(TEST_KEY_ID_1, &key)?;
//!
//!     token.assert_valid_jwt().assert_signed_by(TEST_KEY_ID_1);
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
