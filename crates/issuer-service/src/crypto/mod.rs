//! Ed25519 key generation and token signing.
//!
//! Private key material only ever lives inside [`SigningKey`], which has a
//! redacting Debug implementation and is never serialized.

use crate::errors::IssuerError;
use common::jwk::PublicKey;
use common::jwt::{encode_segment, signing_input, TokenHeader, TokenPayload};
use jsonwebtoken::{crypto, Algorithm, EncodingKey};
use ring::{
    rand::SystemRandom,
    signature::{Ed25519KeyPair, KeyPair},
};
use std::fmt;
use tracing::instrument;

/// Private signing key with its public half.
#[derive(Clone)]
pub struct SigningKey {
    encoding_key: EncodingKey,
    public_key: PublicKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("encoding_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl SigningKey {
    /// Generate a fresh Ed25519 key pair using the system CSPRNG.
    #[instrument(skip_all)]
    pub fn generate() -> Result<Self, IssuerError> {
        let rng = SystemRandom::new();

        let pkcs8_bytes = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|e| IssuerError::Crypto(format!("Keypair generation failed: {e}")))?;

        Self::from_pkcs8(pkcs8_bytes.as_ref())
    }

    /// Load a key from a PKCS#8 document (v1 or v2).
    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Self, IssuerError> {
        let key_pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(pkcs8)
            .map_err(|e| IssuerError::Crypto(format!("Keypair parsing failed: {e}")))?;

        let public_key = PublicKey::from_bytes(key_pair.public_key().as_ref())
            .map_err(|e| IssuerError::Crypto(format!("Public key encoding failed: {e}")))?;

        Ok(Self {
            encoding_key: EncodingKey::from_ed_der(pkcs8),
            public_key,
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Sign `message`, returning the unpadded base64url signature.
    pub fn sign(&self, message: &[u8]) -> Result<String, IssuerError> {
        crypto::sign(message, &self.encoding_key, Algorithm::EdDSA)
            .map_err(|e| IssuerError::Crypto(format!("Signing operation failed: {e}")))
    }
}

/// Assemble and sign a token.
///
/// The header and payload are serialized in field order, encoded as unpadded
/// base64url, and the signature is computed over `header_b64 "." payload_b64`.
#[instrument(skip_all)]
pub fn sign_token(
    header: &TokenHeader,
    payload: &TokenPayload,
    key: &SigningKey,
) -> Result<String, IssuerError> {
    let header_b64 = encode_segment(header)
        .map_err(|e| IssuerError::Crypto(format!("Header encoding failed: {e}")))?;
    let payload_b64 = encode_segment(payload)
        .map_err(|e| IssuerError::Crypto(format!("Payload encoding failed: {e}")))?;

    let input = signing_input(&header_b64, &payload_b64);
    let signature = key.sign(input.as_bytes())?;

    Ok(format!("{input}.{signature}"))
}
