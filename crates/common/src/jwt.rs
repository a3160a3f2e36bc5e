//! Compact token wire format shared by the issuer and all verifiers.
//!
//! A token is three base64url segments (no padding) joined by `.`:
//!
//! ```text
//! base64url(header_json) "." base64url(payload_json) "." base64url(signature)
//! ```
//!
//! The signature covers the ASCII bytes of the first two segments exactly as
//! they appear on the wire, including the separating dot.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE splitting or decoding (DoS prevention)
//! - The `sub`/`upn` fields in [`Claims`] are redacted in Debug output
//! - Header parsing never validates anything; the signature MUST still be
//!   verified with the key named by `kid`

use crate::error::TokenError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Maximum accepted token size in bytes (8KB).
///
/// Typical tokens are 400-700 bytes (`EdDSA` signature, a handful of groups).
/// Oversized input is rejected before any base64 decode or signature check.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Constant `typ` header value.
pub const TOKEN_TYPE: &str = "JWT";

/// `alg` header value for Ed25519 signatures.
pub const SIGNING_ALGORITHM: &str = "EdDSA";

// =============================================================================
// Header and payload
// =============================================================================

/// Token header. Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub typ: String,
    pub alg: String,
    pub kid: String,
}

impl TokenHeader {
    /// Header for a token signed by the key pair `kid`.
    #[must_use]
    pub fn for_key(kid: &str) -> Self {
        Self {
            typ: TOKEN_TYPE.to_string(),
            alg: SIGNING_ALGORITHM.to_string(),
            kid: kid.to_string(),
        }
    }
}

/// Full token payload as minted by the issuer.
///
/// `sub` and `upn` carry the same principal identifier. `exp`, `iat` and
/// `nbf` are Unix epoch seconds.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub iss: String,
    pub aud: Vec<String>,
    #[serde(rename = "tenant-id")]
    pub tenant_id: String,
    pub sub: String,
    pub upn: String,
    pub scope: String,
    pub groups: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub jti: String,
}

impl fmt::Debug for TokenPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPayload")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("tenant_id", &self.tenant_id)
            .field("sub", &"[REDACTED]")
            .field("upn", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("groups", &self.groups)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("jti", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Claims
// =============================================================================

/// Claims handed back to callers after a successful verification.
///
/// Only these five fields are extracted; issuer and audience checking is the
/// caller's responsibility.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "tenant-id")]
    pub tenant_id: String,
    pub sub: String,
    pub upn: String,
    pub scope: String,
    pub groups: Vec<String>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("tenant_id", &self.tenant_id)
            .field("sub", &"[REDACTED]")
            .field("upn", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("groups", &self.groups)
            .finish()
    }
}

impl Claims {
    /// Individual scopes. The scope string may be space- or comma-joined.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Check if the token has a specific scope.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().contains(&scope)
    }

    /// Check if the principal is a member of `group`.
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Flat string mapping with keys `tenant-id`, `sub`, `upn`, `scope` and
    /// `groups`, the latter serialized as a JSON array string.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let groups = serde_json::to_string(&self.groups).unwrap_or_else(|_| "[]".to_string());
        BTreeMap::from([
            ("tenant-id".to_string(), self.tenant_id.clone()),
            ("sub".to_string(), self.sub.clone()),
            ("upn".to_string(), self.upn.clone()),
            ("scope".to_string(), self.scope.clone()),
            ("groups".to_string(), groups),
        ])
    }
}

// =============================================================================
// Segments
// =============================================================================

/// Borrowed view of the three segments of a token.
#[derive(Debug, Clone, Copy)]
pub struct TokenParts<'a> {
    pub header: &'a str,
    pub payload: &'a str,
    pub signature: &'a str,
    /// `header "." payload`, exactly as received.
    pub signing_input: &'a str,
}

impl<'a> TokenParts<'a> {
    /// Split a token into its segments.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MalformedToken` if the token exceeds
    /// [`MAX_JWT_SIZE_BYTES`] or does not have exactly three segments.
    pub fn split(token: &'a str) -> Result<Self, TokenError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "common.jwt",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(TokenError::MalformedToken(
                "token exceeds maximum size".to_string(),
            ));
        }

        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            tracing::debug!(
                target: "common.jwt",
                segments = token.split('.').count(),
                "Token rejected: expected 3 segments"
            );
            return Err(TokenError::MalformedToken(
                "expected 3 segments".to_string(),
            ));
        };

        let signing_input = token
            .get(..header.len() + 1 + payload.len())
            .ok_or_else(|| TokenError::MalformedToken("expected 3 segments".to_string()))?;

        Ok(Self {
            header,
            payload,
            signature,
            signing_input,
        })
    }

    /// Decode the header segment as JSON.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MalformedToken` on invalid base64url or JSON.
    pub fn header_json(&self) -> Result<serde_json::Value, TokenError> {
        decode_json_segment(self.header, "header")
    }

    /// Decode the payload segment as JSON.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MalformedToken` on invalid base64url or JSON.
    pub fn payload_json(&self) -> Result<serde_json::Value, TokenError> {
        decode_json_segment(self.payload, "payload")
    }

    /// The `kid` header value.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MalformedToken` if the header cannot be decoded or
    /// has no non-empty string `kid`.
    pub fn kid(&self) -> Result<String, TokenError> {
        self.header_json()?
            .get("kid")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .ok_or_else(|| {
                tracing::debug!(target: "common.jwt", "Token rejected: header has no kid");
                TokenError::MalformedToken("header has no kid".to_string())
            })
    }
}

/// Extract the `kid` (key ID) from a token header without verifying anything.
///
/// # Errors
///
/// Returns `TokenError::MalformedToken` if the token is oversized, does not
/// have three segments, or its header lacks a `kid`.
pub fn extract_kid(token: &str) -> Result<String, TokenError> {
    TokenParts::split(token)?.kid()
}

/// Serialize `value` as JSON and encode it as an unpadded base64url segment.
///
/// # Errors
///
/// Returns the `serde_json` error if serialization fails.
pub fn encode_segment<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(value)?))
}

/// Bytes covered by the signature: `header_b64 "." payload_b64`.
#[must_use]
pub fn signing_input(header_b64: &str, payload_b64: &str) -> String {
    format!("{header_b64}.{payload_b64}")
}

fn decode_json_segment(segment: &str, name: &str) -> Result<serde_json::Value, TokenError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to decode token segment base64");
        TokenError::MalformedToken(format!("{name} is not valid base64url"))
    })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to parse token segment JSON");
        TokenError::MalformedToken(format!("{name} is not valid JSON"))
    })
}

// =============================================================================
// Tests
// =============================================================================
