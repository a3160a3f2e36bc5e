//! Token issuance and key publication.

use crate::config::Config;
use crate::crypto;
use crate::errors::IssuerError;
use crate::observability::{hash_for_correlation, metrics};
use crate::services::key_cache::KeyCache;
use common::jwk::{JwkRecord, JwkSet};
use common::jwt::{TokenHeader, TokenPayload};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// What a token is issued for.
#[derive(Clone)]
pub struct TokenRequest {
    pub tenant_id: String,
    /// Principal identifier, written to both `sub` and `upn`.
    pub subject: String,
    /// Space- or comma-joined scopes, copied verbatim.
    pub scope: String,
    pub groups: Vec<String>,
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("tenant_id", &self.tenant_id)
            .field("subject", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("groups", &self.groups)
            .finish()
    }
}

impl TokenRequest {
    pub fn new(
        tenant_id: impl Into<String>,
        subject: impl Into<String>,
        scope: impl Into<String>,
        groups: Vec<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            subject: subject.into(),
            scope: scope.into(),
            groups,
        }
    }
}

/// Mints tokens with keys from the rotation cache.
#[derive(Debug, Clone)]
pub struct TokenService {
    cache: Arc<KeyCache>,
    issuer: String,
    audiences: Vec<String>,
}

impl TokenService {
    pub fn new(cache: Arc<KeyCache>, issuer: String, audiences: Vec<String>) -> Self {
        Self {
            cache,
            issuer,
            audiences,
        }
    }

    pub fn from_config(cache: Arc<KeyCache>, config: &Config) -> Self {
        Self::new(cache, config.issuer.clone(), config.audiences.clone())
    }

    pub fn cache(&self) -> &Arc<KeyCache> {
        &self.cache
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audiences(&self) -> &[String] {
        &self.audiences
    }

    /// Issue a token signed with the current signing key.
    pub async fn issue(&self, request: &TokenRequest) -> Result<String, IssuerError> {
        self.issue_at(request, chrono::Utc::now().timestamp()).await
    }

    /// Issue a token as of `now`: `iat = nbf = now`, `exp = now + token_lifetime`.
    ///
    /// # Errors
    ///
    /// - `IssuerError::SigningUnavailable` if no key pair can sign
    /// - `IssuerError::Crypto` if encoding or signing fails
    #[instrument(skip_all, fields(tenant_id = %request.tenant_id, kid = tracing::field::Empty))]
    pub async fn issue_at(&self, request: &TokenRequest, now: i64) -> Result<String, IssuerError> {
        let start = Instant::now();
        let result = self.sign_at(request, now).await;

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_token_issuance(status, start.elapsed());

        match &result {
            Ok(_) => tracing::info!(
                target: "issuer.token",
                subject_hash = %hash_for_correlation(&request.subject),
                "Token issued"
            ),
            Err(e) => tracing::error!(target: "issuer.token", error = %e, "Token issuance failed"),
        }

        result
    }

    async fn sign_at(&self, request: &TokenRequest, now: i64) -> Result<String, IssuerError> {
        let pair = self
            .cache
            .pick_signable_at(now)
            .await
            .map_err(IssuerError::into_signing_unavailable)?;
        tracing::Span::current().record("kid", pair.id());

        let header = TokenHeader::for_key(pair.id());
        let payload = TokenPayload {
            iss: self.issuer.clone(),
            aud: self.audiences.clone(),
            tenant_id: request.tenant_id.clone(),
            sub: request.subject.clone(),
            upn: request.subject.clone(),
            scope: request.scope.clone(),
            groups: request.groups.clone(),
            exp: now.saturating_add(self.cache.token_lifetime_seconds()),
            iat: now,
            nbf: now,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        crypto::sign_token(&header, &payload, pair.signing_key())
    }

    /// Publish the public half of key pair `kid`.
    pub async fn publish_key(&self, kid: &str) -> Result<JwkRecord, IssuerError> {
        self.publish_key_at(kid, chrono::Utc::now().timestamp()).await
    }

    /// [`TokenService::publish_key`] as of `now`.
    ///
    /// # Errors
    ///
    /// `IssuerError::UnknownKey` if the pair is absent or its public half has
    /// expired.
    #[instrument(skip_all)]
    pub async fn publish_key_at(&self, kid: &str, now: i64) -> Result<JwkRecord, IssuerError> {
        let pair = self.cache.lookup_at(kid, now).await.ok_or_else(|| {
            tracing::debug!(target: "issuer.jwk", kid = %kid, "Requested key not found");
            IssuerError::UnknownKey(kid.to_string())
        })?;

        Ok(JwkRecord::from_public_key(pair.id(), pair.public_key()))
    }

    /// Publish every key pair still verifiable at `now`.
    pub async fn publish_all_at(&self, now: i64) -> JwkSet {
        let keys = self
            .cache
            .verifiable_keys_at(now)
            .await
            .iter()
            .map(|pair| JwkRecord::from_public_key(pair.id(), pair.public_key()))
            .collect();

        JwkSet { keys }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use common::jwt::TokenParts;

    const T0: i64 = 1_700_000_000;

    fn service(min_live_keys: usize) -> TokenService {
        TokenService::new(
            Arc::new(KeyCache::new(min_live_keys, 60, 30)),
            "https://issuer.test".to_string(),
            vec!["urn:a".to_string(), "urn:b".to_string()],
        )
    }

    fn request() -> TokenRequest {
        TokenRequest::new("tenant-7", "carol", "read write", vec!["staff".to_string()])
    }

    #[tokio::test]
    async fn test_issue_payload_fields() {
        let service = service(1);
        let token = service.issue_at(&request(), T0).await.unwrap();

        let parts = TokenParts::split(&token).unwrap();
        let header = parts.header_json().unwrap();
        assert_eq!(header["typ"], "JWT");
        assert_eq!(header["alg"], "EdDSA");

        let payload = parts.payload_json().unwrap();
        assert_eq!(payload["iss"], "https://issuer.test");
        assert_eq!(payload["aud"], serde_json::json!(["urn:a", "urn:b"]));
        assert_eq!(payload["tenant-id"], "tenant-7");
        assert_eq!(payload["sub"], "carol");
        assert_eq!(payload["upn"], "carol");
        assert_eq!(payload["scope"], "read write");
        assert_eq!(payload["groups"], serde_json::json!(["staff"]));
        assert_eq!(payload["iat"], T0);
        assert_eq!(payload["nbf"], T0);
        assert_eq!(payload["exp"], T0 + 30);
        assert!(uuid::Uuid::parse_str(payload["jti"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_issue_uses_picked_key() {
        let service = service(2);
        let token = service.issue_at(&request(), T0).await.unwrap();

        let expected = service.cache().pick_signable_at(T0).await.unwrap();
        let kid = TokenParts::split(&token).unwrap().kid().unwrap();
        assert_eq!(kid, expected.id());
    }

    #[tokio::test]
    async fn test_issue_fresh_jti_per_token() {
        let service = service(1);
        let a = service.issue_at(&request(), T0).await.unwrap();
        let b = service.issue_at(&request(), T0).await.unwrap();

        let jti = |t: &str| TokenParts::split(t).unwrap().payload_json().unwrap()["jti"].clone();
        assert_ne!(jti(&a), jti(&b));
    }

    #[tokio::test]
    async fn test_issue_without_signing_key() {
        let service = service(0);
        let result = service.issue_at(&request(), T0).await;
        assert!(matches!(result, Err(IssuerError::SigningUnavailable(_))));
    }

    #[tokio::test]
    async fn test_publish_key_matches_cache() {
        let service = service(1);
        let pair = service.cache().pick_signable_at(T0).await.unwrap();

        let record = service.publish_key_at(pair.id(), T0).await.unwrap();
        assert_eq!(record.kid, pair.id());
        assert_eq!(record.to_public_key().unwrap(), *pair.public_key());
    }

    #[tokio::test]
    async fn test_publish_unknown_key() {
        let service = service(1);
        service.cache().ensure_warm_at(T0).await.unwrap();

        let result = service.publish_key_at("missing", T0).await;
        assert!(matches!(result, Err(IssuerError::UnknownKey(k)) if k == "missing"));
    }

    #[tokio::test]
    async fn test_publish_key_after_public_expiry() {
        let service = service(1);
        let pair = service.cache().pick_signable_at(T0).await.unwrap();

        // public window ends at T0 + 60 + 30
        assert!(service.publish_key_at(pair.id(), T0 + 90).await.is_ok());
        assert!(matches!(
            service.publish_key_at(pair.id(), T0 + 91).await,
            Err(IssuerError::UnknownKey(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_all() {
        let service = service(3);
        service.cache().ensure_warm_at(T0).await.unwrap();

        let set = service.publish_all_at(T0).await;
        assert_eq!(set.keys.len(), 3);
        for record in &set.keys {
            assert!(service.cache().lookup_at(&record.kid, T0).await.is_some());
        }
    }

    #[test]
    fn test_request_debug_redacts_subject() {
        let debug = format!("{:?}", request());
        assert!(!debug.contains("carol"));
        assert!(debug.contains("tenant-7"));
    }
}
