//! Published public keys.
//!
//! The issuer publishes each key pair's public half as a JWK record:
//!
//! ```json
//! {"kty":"OKP","crv":"Ed25519","kid":"<uuid>","x":"<base64url>"}
//! ```
//!
//! `x` is the base64url encoding of the key's SubjectPublicKeyInfo DER with
//! the first 16 characters removed. The Ed25519 SPKI prefix is exactly 12
//! bytes, which encode to exactly 16 characters without straddling a base64
//! group, so what remains is the base64url encoding of the raw 32-byte
//! RFC 8032 point encoding.
//!
//! A verifier turns `x` back into a point by taking the x-parity from the top
//! bit of the last byte, clearing that bit, and reading the remaining 255 bits
//! as the little-endian y coordinate.

use crate::error::TokenError;
use base64::{
    alphabet,
    engine::{general_purpose::URL_SAFE_NO_PAD, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use jsonwebtoken::{crypto, Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `kty` value for octet key pairs (RFC 8037).
pub const KEY_TYPE_OKP: &str = "OKP";

/// Length of a raw Ed25519 public key.
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// DER prefix of an Ed25519 SubjectPublicKeyInfo (RFC 8410).
pub const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Characters stripped from the base64url SPKI to obtain `x`.
pub const SPKI_PREFIX_B64_CHARS: usize = 16;

/// Field prime p = 2^255 - 19, big-endian.
const FIELD_PRIME_BE: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xed,
];

// Accepts `x` with or without trailing padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// =============================================================================
// Curve
// =============================================================================

/// Named curves a JWK record may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Ed25519,
}

impl Curve {
    /// Canonical `crv` name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Curve::Ed25519 => "Ed25519",
        }
    }

    /// Look up a curve by its `crv` name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Ed25519" => Some(Curve::Ed25519),
            _ => None,
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// EdwardsPoint
// =============================================================================

/// A point on edwards25519 in compressed form: the y coordinate and the
/// parity of x.
///
/// Only canonical y (`y < p`) is representable. Whether y actually lies on the
/// curve is not checked here; an off-curve point fails later as a signature
/// mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdwardsPoint {
    x_is_odd: bool,
    /// Big-endian.
    y: [u8; 32],
}

impl EdwardsPoint {
    /// Build a point from x-parity and a big-endian y coordinate.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::KeyDecodeFailed` if `y >= p`.
    pub fn new(x_is_odd: bool, y: [u8; 32]) -> Result<Self, TokenError> {
        if y >= FIELD_PRIME_BE {
            return Err(TokenError::KeyDecodeFailed(
                "y coordinate is not a canonical field element".to_string(),
            ));
        }
        Ok(Self { x_is_odd, y })
    }

    /// Decode the 32-byte RFC 8032 encoding.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::KeyDecodeFailed` on wrong length or
    /// non-canonical y.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, TokenError> {
        let mut y: [u8; 32] = bytes.try_into().map_err(|_| {
            TokenError::KeyDecodeFailed(format!(
                "expected {ED25519_PUBLIC_KEY_LEN} key bytes, got {}",
                bytes.len()
            ))
        })?;

        let mut x_is_odd = false;
        if let Some(last) = y.last_mut() {
            x_is_odd = *last & 0x80 != 0;
            *last &= 0x7f;
        }
        y.reverse();

        Self::new(x_is_odd, y)
    }

    /// The 32-byte RFC 8032 encoding.
    #[must_use]
    pub fn to_encoded(&self) -> [u8; 32] {
        let mut out = self.y;
        out.reverse();
        if self.x_is_odd {
            if let Some(last) = out.last_mut() {
                *last |= 0x80;
            }
        }
        out
    }

    #[must_use]
    pub fn x_is_odd(&self) -> bool {
        self.x_is_odd
    }

    /// Big-endian y coordinate.
    #[must_use]
    pub fn y(&self) -> &[u8; 32] {
        &self.y
    }
}

// =============================================================================
// PublicKey
// =============================================================================

/// An Ed25519 public key usable for signature verification.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    bytes: [u8; 32],
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey")
            .field(&URL_SAFE_NO_PAD.encode(self.bytes))
            .finish()
    }
}

impl PublicKey {
    /// Build from a decoded point.
    #[must_use]
    pub fn from_point(point: &EdwardsPoint) -> Self {
        Self {
            bytes: point.to_encoded(),
        }
    }

    /// Build from the raw 32-byte encoding.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::KeyDecodeFailed` on wrong length or
    /// non-canonical y.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TokenError> {
        EdwardsPoint::from_encoded(bytes).map(|point| Self::from_point(&point))
    }

    /// Raw 32-byte encoding.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    #[must_use]
    pub fn to_point(&self) -> Option<EdwardsPoint> {
        EdwardsPoint::from_encoded(&self.bytes).ok()
    }

    /// SubjectPublicKeyInfo DER encoding.
    #[must_use]
    pub fn to_spki_der(&self) -> Vec<u8> {
        let mut der = Vec::with_capacity(ED25519_SPKI_PREFIX.len() + ED25519_PUBLIC_KEY_LEN);
        der.extend_from_slice(&ED25519_SPKI_PREFIX);
        der.extend_from_slice(&self.bytes);
        der
    }

    /// Verify a base64url signature over `message`.
    ///
    /// Any failure (undecodable signature, point not on the curve, mismatch)
    /// is reported as `false`.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature_b64: &str) -> bool {
        let key = DecodingKey::from_ed_der(&self.bytes);
        match crypto::verify(signature_b64, message, &key, Algorithm::EdDSA) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::debug!(target: "common.jwk", error = %e, "Signature check failed");
                false
            }
        }
    }
}

// =============================================================================
// JWK records
// =============================================================================

/// A published public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkRecord {
    pub kty: String,
    pub crv: String,
    pub kid: String,
    pub x: String,
}

impl JwkRecord {
    /// Publish `key` under `kid`.
    #[must_use]
    pub fn from_public_key(kid: &str, key: &PublicKey) -> Self {
        let spki_b64 = URL_SAFE_NO_PAD.encode(key.to_spki_der());
        let x = spki_b64
            .get(SPKI_PREFIX_B64_CHARS..)
            .map_or_else(|| URL_SAFE_NO_PAD.encode(key.as_bytes()), str::to_string);

        Self {
            kty: KEY_TYPE_OKP.to_string(),
            crv: Curve::Ed25519.name().to_string(),
            kid: kid.to_string(),
            x,
        }
    }

    /// Reconstruct the public key from `crv` and `x`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::KeyDecodeFailed` if the key type or curve is not
    /// supported, `x` is not base64url, or does not decode to a canonical
    /// 32-byte point encoding.
    pub fn to_public_key(&self) -> Result<PublicKey, TokenError> {
        if self.kty != KEY_TYPE_OKP {
            return Err(TokenError::KeyDecodeFailed(format!(
                "unsupported key type: {}",
                self.kty
            )));
        }

        let curve = Curve::from_name(&self.crv).ok_or_else(|| {
            TokenError::KeyDecodeFailed(format!("unsupported curve: {}", self.crv))
        })?;

        let bytes = URL_SAFE_LENIENT
            .decode(&self.x)
            .map_err(|e| TokenError::KeyDecodeFailed(format!("x is not base64url: {e}")))?;

        match curve {
            Curve::Ed25519 => PublicKey::from_bytes(&bytes),
        }
    }
}

/// A set of published keys, as served at the well-known location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<JwkRecord>,
}

impl JwkSet {
    /// Find a key by its `kid`.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&JwkRecord> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

// =============================================================================
// Tests
// =============================================================================
