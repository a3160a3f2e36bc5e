//! Token verification.
//!
//! Both trust domains run the same algorithm and differ only in where the
//! public key comes from, which is abstracted by [`KeyResolver`]:
//!
//! 1. Split the token and read `kid` from the header
//! 2. Resolve `kid` to a public key; an unknown key rejects the token
//! 3. Verify the signature over `header "." payload`
//! 4. Require `exp` and reject if `now > exp`
//! 5. Extract the claims
//!
//! Rejection (`Ok(None)`) deliberately does not say which check failed.

use crate::error::TokenError;
use crate::jwk::PublicKey;
use crate::jwt::{Claims, TokenParts};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

/// Maps a key ID to a public key.
///
/// `Ok(None)` means the key is unknown (never existed, or already evicted).
/// `Err` is reserved for failures to look the key up at all.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, kid: &str, now: i64) -> Result<Option<PublicKey>, TokenError>;
}

#[async_trait]
impl<T: KeyResolver + ?Sized> KeyResolver for Arc<T> {
    async fn resolve(&self, kid: &str, now: i64) -> Result<Option<PublicKey>, TokenError> {
        (**self).resolve(kid, now).await
    }
}

/// Verifies tokens against keys supplied by a [`KeyResolver`].
#[derive(Debug, Clone)]
pub struct TokenVerifier<R> {
    resolver: R,
}

impl<R: KeyResolver> TokenVerifier<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Verify a token against the current wall clock.
    ///
    /// # Errors
    ///
    /// See [`TokenVerifier::verify_at`].
    pub async fn verify(&self, token: &str) -> Result<Option<Claims>, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp()).await
    }

    /// Verify a token as of `now` (Unix epoch seconds).
    ///
    /// Returns `Ok(Some(claims))` for an authentic unexpired token and
    /// `Ok(None)` if the key is unknown, the signature does not match, or the
    /// token has expired.
    ///
    /// # Errors
    ///
    /// - `TokenError::MalformedToken` for structural problems, a missing
    ///   `kid` or `exp`, or missing claim fields
    /// - whatever the resolver returns when it cannot look the key up
    #[instrument(skip_all, fields(kid = tracing::field::Empty))]
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<Option<Claims>, TokenError> {
        let parts = TokenParts::split(token)?;
        let kid = parts.kid()?;
        tracing::Span::current().record("kid", kid.as_str());

        let Some(key) = self.resolver.resolve(&kid, now).await? else {
            tracing::debug!(target: "common.verifier", "Token rejected: unknown key");
            return Ok(None);
        };

        if !key.verify(parts.signing_input.as_bytes(), parts.signature) {
            tracing::debug!(target: "common.verifier", "Token rejected: signature mismatch");
            return Ok(None);
        }

        let payload = parts.payload_json()?;

        let exp = payload
            .get("exp")
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| {
                tracing::debug!(target: "common.verifier", "Token rejected: exp missing");
                TokenError::MalformedToken("exp missing".to_string())
            })?;

        if now > exp {
            tracing::debug!(
                target: "common.verifier",
                exp = exp,
                now = now,
                "Token rejected: expired"
            );
            return Ok(None);
        }

        let claims: Claims = serde_json::from_value(payload).map_err(|e| {
            tracing::debug!(target: "common.verifier", error = %e, "Token rejected: claims incomplete");
            TokenError::MalformedToken("required claim missing".to_string())
        })?;

        Ok(Some(claims))
    }
}

// =============================================================================
// Tests
// =============================================================================
