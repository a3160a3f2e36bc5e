//! Key publication client for fetching and caching issuer public keys.
//!
//! Keys are fetched one at a time from `GET <jwk_endpoint>?kid=<id>` and
//! rebuilt from the record's `x` coordinate. Successful lookups are cached
//! per `kid` for a configurable TTL; a 404 or a failed fetch is never cached,
//! so a key the issuer has only just generated is picked up on the next
//! request.
//!
//! # Security
//!
//! - The record must name the `kid` that was asked for
//! - HTTPS should be used in production (enforced by deployment config)

use crate::config::Config;
use crate::errors::VerifierError;
use crate::observability::metrics;
use common::error::TokenError;
use common::jwk::{JwkRecord, PublicKey};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

#[derive(Debug, Clone, Copy)]
struct CachedKey {
    key: PublicKey,

    /// Epoch second after which the entry must be fetched again.
    expires_at: i64,
}

/// Fetches public keys from the issuer's key publication endpoint.
#[derive(Debug)]
pub struct JwkClient {
    jwk_endpoint: String,
    http_client: reqwest::Client,
    cache: RwLock<HashMap<String, CachedKey>>,
    cache_ttl_seconds: i64,
}

impl JwkClient {
    /// Build a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// `VerifierError::HttpClient` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, VerifierError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_seconds))
            .build()
            .map_err(|e| {
                tracing::error!(target: "verifier.jwk", error = %e, "Failed to build HTTP client");
                VerifierError::HttpClient(e.to_string())
            })?;

        Ok(Self::with_client(
            config.jwk_endpoint.clone(),
            http_client,
            config.cache_ttl_seconds,
        ))
    }

    /// Wrap an existing HTTP client.
    pub fn with_client(
        jwk_endpoint: String,
        http_client: reqwest::Client,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            jwk_endpoint,
            http_client,
            cache: RwLock::new(HashMap::new()),
            cache_ttl_seconds: i64::try_from(cache_ttl_seconds).unwrap_or(i64::MAX),
        }
    }

    pub fn jwk_endpoint(&self) -> &str {
        &self.jwk_endpoint
    }

    /// Resolve `kid` to a public key as of `now`.
    ///
    /// Returns `Ok(None)` if the issuer does not know the key.
    ///
    /// # Errors
    ///
    /// - `TokenError::KeyFetchFailed` on network errors, timeouts, unexpected
    ///   status codes, unparseable bodies, or a record for another `kid`
    /// - `TokenError::KeyDecodeFailed` if the record cannot be turned into
    ///   an Ed25519 public key
    #[instrument(skip_all, fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str, now: i64) -> Result<Option<PublicKey>, TokenError> {
        if self.cache_ttl_seconds > 0 {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(kid).filter(|c| now <= c.expires_at) {
                tracing::debug!(target: "verifier.jwk", "JWK cache hit");
                metrics::record_jwk_cache("hit");
                return Ok(Some(cached.key));
            }
        }
        metrics::record_jwk_cache("miss");

        let Some(key) = self.fetch_key(kid).await? else {
            return Ok(None);
        };

        if self.cache_ttl_seconds > 0 {
            let mut cache = self.cache.write().await;
            cache.retain(|_, cached| now <= cached.expires_at);
            cache.insert(
                kid.to_string(),
                CachedKey {
                    key,
                    expires_at: now.saturating_add(self.cache_ttl_seconds),
                },
            );
        }

        Ok(Some(key))
    }

    /// Fetch and decode in one timed step. A record that arrives but cannot
    /// be decoded is counted as `decode_error`.
    async fn fetch_key(&self, kid: &str) -> Result<Option<PublicKey>, TokenError> {
        tracing::debug!(target: "verifier.jwk", url = %self.jwk_endpoint, "Fetching JWK from issuer");

        let start = Instant::now();
        let result = match self.request_record(kid).await {
            Ok(Some(record)) => record.to_public_key().map(Some).map_err(|e| {
                tracing::warn!(target: "verifier.jwk", error = %e, "Published key could not be decoded");
                e
            }),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        metrics::record_jwk_fetch(fetch_status(&result), start.elapsed());

        result
    }

    async fn request_record(&self, kid: &str) -> Result<Option<JwkRecord>, TokenError> {
        let response = self
            .http_client
            .get(&self.jwk_endpoint)
            .query(&[("kid", kid)])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "verifier.jwk", error = %e, "Failed to fetch JWK");
                TokenError::KeyFetchFailed(format!("request failed: {e}"))
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                tracing::debug!(target: "verifier.jwk", "Issuer does not know key");
                return Ok(None);
            }
            status => {
                tracing::error!(
                    target: "verifier.jwk",
                    status = %status,
                    "JWK endpoint returned error"
                );
                return Err(TokenError::KeyFetchFailed(format!(
                    "unexpected status {status}"
                )));
            }
        }

        let record: JwkRecord = response.json().await.map_err(|e| {
            tracing::error!(target: "verifier.jwk", error = %e, "Failed to parse JWK response");
            TokenError::KeyFetchFailed(format!("invalid response body: {e}"))
        })?;

        if record.kid != kid {
            tracing::error!(
                target: "verifier.jwk",
                returned_kid = %record.kid,
                "JWK endpoint returned a different key"
            );
            return Err(TokenError::KeyFetchFailed(
                "response names a different kid".to_string(),
            ));
        }

        Ok(Some(record))
    }

    /// Drop every cached key.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Number of cached keys, including ones past their TTL that have not
    /// been pruned yet.
    pub async fn cached_keys(&self) -> usize {
        self.cache.read().await.len()
    }
}

fn fetch_status(result: &Result<Option<PublicKey>, TokenError>) -> &'static str {
    match result {
        Ok(Some(_)) => "success",
        Ok(None) => "not_found",
        Err(TokenError::KeyDecodeFailed(_)) => "decode_error",
        Err(_) => "error",
    }
}
