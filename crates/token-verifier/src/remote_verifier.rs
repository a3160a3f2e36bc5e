//! Verification against keys fetched from the issuer.

use crate::config::Config;
use crate::errors::VerifierError;
use crate::jwk_client::JwkClient;
use crate::observability::metrics;
use async_trait::async_trait;
use common::error::TokenError;
use common::jwk::PublicKey;
use common::jwt::Claims;
use common::verifier::{KeyResolver, TokenVerifier};
use std::sync::Arc;
use tracing::instrument;

/// Resolves `kid` through the issuer's key publication endpoint.
#[derive(Debug, Clone)]
pub struct RemoteKeyResolver {
    client: Arc<JwkClient>,
}

impl RemoteKeyResolver {
    pub fn new(client: Arc<JwkClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<JwkClient> {
        &self.client
    }
}

#[async_trait]
impl KeyResolver for RemoteKeyResolver {
    async fn resolve(&self, kid: &str, now: i64) -> Result<Option<PublicKey>, TokenError> {
        self.client.get_key(kid, now).await
    }
}

/// Verifies tokens without access to the issuer's key cache.
///
/// Unknown key, bad signature and expiry all yield `Ok(None)`. Failing to
/// reach the issuer is an error, never a rejection.
#[derive(Debug, Clone)]
pub struct RemoteTokenVerifier {
    inner: TokenVerifier<RemoteKeyResolver>,
}

impl RemoteTokenVerifier {
    pub fn new(client: Arc<JwkClient>) -> Self {
        Self {
            inner: TokenVerifier::new(RemoteKeyResolver::new(client)),
        }
    }

    /// # Errors
    ///
    /// `VerifierError::HttpClient` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, VerifierError> {
        Ok(Self::new(Arc::new(JwkClient::new(config)?)))
    }

    pub fn client(&self) -> &Arc<JwkClient> {
        self.inner.resolver().client()
    }

    /// Verify a token against the current wall clock.
    pub async fn verify(&self, token: &str) -> Result<Option<Claims>, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp()).await
    }

    /// Verify a token as of `now`.
    ///
    /// # Errors
    ///
    /// - `TokenError::MalformedToken` for structural problems
    /// - `TokenError::KeyFetchFailed` if the issuer cannot be asked
    /// - `TokenError::KeyDecodeFailed` if the published key is unusable
    #[instrument(skip_all)]
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<Option<Claims>, TokenError> {
        let result = self.inner.verify_at(token, now).await;
        metrics::record_token_verification(&result);
        result
    }
}
