//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 key pairs. The same seed always produces
//! the same key.

use issuer_service::crypto::SigningKey;
use issuer_service::services::KeyPair;
use ring::signature::{Ed25519KeyPair, KeyPair as _};
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// Expand a one-byte seed into a 32-byte Ed25519 seed.
pub fn test_seed(seed: u8) -> [u8; 32] {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    seed_bytes
}

/// PKCS#8 v1 document for the key derived from `seed`.
pub fn test_pkcs8(seed: u8) -> Vec<u8> {
    build_pkcs8_from_seed(&test_seed(seed))
}

/// Raw 32-byte public key for the key derived from `seed`.
pub fn test_public_key_bytes(seed: u8) -> Result<[u8; 32], FixtureError> {
    let key_pair = Ed25519KeyPair::from_seed_unchecked(&test_seed(seed))
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {e:?}")))?;

    key_pair
        .public_key()
        .as_ref()
        .try_into()
        .map_err(|_| FixtureError::Crypto("Unexpected public key length".to_string()))
}

/// Deterministic signing key.
///
/// # Example
/// ```rust,ignore
/// let a = test_signing_key(1)?;
/// let b = test_signing_key(1)?;
/// assert_eq!(a.public_key(), b.public_key());
/// ```
pub fn test_signing_key(seed: u8) -> Result<SigningKey, FixtureError> {
    SigningKey::from_pkcs8(&test_pkcs8(seed))
        .map_err(|e| FixtureError::Crypto(format!("Failed to load test keypair: {e}")))
}

/// Deterministic key pair with fixed id and windows, ready for
/// `KeyCache::insert`.
pub fn test_key_pair(
    seed: u8,
    kid: &str,
    created_at: i64,
    key_pair_lifetime_seconds: i64,
    token_lifetime_seconds: i64,
) -> Result<KeyPair, FixtureError> {
    Ok(KeyPair::with_key(
        kid.to_string(),
        test_signing_key(seed)?,
        created_at,
        key_pair_lifetime_seconds,
        token_lifetime_seconds,
    ))
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// This is a test-only utility. Production keys come from `SystemRandom`.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    // SEQUENCE { version INTEGER 0, AlgorithmIdentifier { 1.3.101.112 },
    //            privateKey OCTET STRING { OCTET STRING seed } }
    let mut pkcs8 = Vec::with_capacity(48);

    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}
