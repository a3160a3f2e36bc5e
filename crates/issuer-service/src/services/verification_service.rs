//! Local verification against the issuer's own key cache.

use crate::observability::metrics;
use crate::services::key_cache::KeyCache;
use async_trait::async_trait;
use common::error::TokenError;
use common::jwk::PublicKey;
use common::jwt::Claims;
use common::verifier::{KeyResolver, TokenVerifier};
use std::sync::Arc;
use tracing::instrument;

/// Resolves `kid` against the in-process key cache.
#[derive(Debug, Clone)]
pub struct CacheKeyResolver {
    cache: Arc<KeyCache>,
}

impl CacheKeyResolver {
    pub fn new(cache: Arc<KeyCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl KeyResolver for CacheKeyResolver {
    async fn resolve(&self, kid: &str, now: i64) -> Result<Option<PublicKey>, TokenError> {
        Ok(self
            .cache
            .lookup_at(kid, now)
            .await
            .map(|pair| *pair.public_key()))
    }
}

/// Verifies tokens minted by this process.
#[derive(Debug, Clone)]
pub struct LocalTokenVerifier {
    inner: TokenVerifier<CacheKeyResolver>,
}

impl LocalTokenVerifier {
    pub fn new(cache: Arc<KeyCache>) -> Self {
        Self {
            inner: TokenVerifier::new(CacheKeyResolver::new(cache)),
        }
    }

    /// Verify a token against the current wall clock.
    pub async fn verify(&self, token: &str) -> Result<Option<Claims>, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp()).await
    }

    /// Verify a token as of `now`.
    ///
    /// `Ok(None)` covers unknown key, bad signature and expiry alike.
    #[instrument(skip_all)]
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<Option<Claims>, TokenError> {
        let result = self.inner.verify_at(token, now).await;
        metrics::record_token_verification(outcome(&result));
        result
    }
}

pub(crate) fn outcome(result: &Result<Option<Claims>, TokenError>) -> &'static str {
    match result {
        Ok(Some(_)) => "valid",
        Ok(None) => "rejected",
        Err(TokenError::MalformedToken(_)) => "malformed",
        Err(_) => "error",
    }
}
