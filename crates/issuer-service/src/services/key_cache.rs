//! Self-rotating pool of Ed25519 signing key pairs.
//!
//! Each pair has two windows:
//!
//! ```text
//! created_at ──────── private_expires_at ──────── public_expires_at
//!             signs and verifies        verifies only
//! ```
//!
//! `private_expires_at = created_at + key_pair_lifetime` and
//! `public_expires_at = private_expires_at + token_lifetime`, so every token a
//! pair signs expires before the pair stops being verifiable.
//!
//! Replenishment is synchronous: [`KeyCache::ensure_warm`] tops the pool up to
//! `min_live_keys` privately live pairs and is called at startup and before
//! every signing attempt. There is no background timer.
//!
//! Every operation has an `*_at(now)` variant taking Unix epoch seconds. The
//! plain variants read the wall clock.

use crate::config::Config;
use crate::crypto::SigningKey;
use crate::errors::IssuerError;
use crate::observability::metrics;
use common::jwk::PublicKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

/// A signing key pair with its validity windows. Immutable once created.
#[derive(Debug, Clone)]
pub struct KeyPair {
    id: String,
    created_at: i64,
    private_expires_at: i64,
    public_expires_at: i64,
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a pair with fresh key material and a fresh UUID v4 id.
    pub fn generate_at(
        now: i64,
        key_pair_lifetime_seconds: i64,
        token_lifetime_seconds: i64,
    ) -> Result<Self, IssuerError> {
        Ok(Self::with_key(
            uuid::Uuid::new_v4().to_string(),
            SigningKey::generate()?,
            now,
            key_pair_lifetime_seconds,
            token_lifetime_seconds,
        ))
    }

    /// Wrap existing key material.
    pub fn with_key(
        id: String,
        signing_key: SigningKey,
        created_at: i64,
        key_pair_lifetime_seconds: i64,
        token_lifetime_seconds: i64,
    ) -> Self {
        let private_expires_at = created_at.saturating_add(key_pair_lifetime_seconds);
        let public_expires_at = private_expires_at.saturating_add(token_lifetime_seconds);

        Self {
            id,
            created_at,
            private_expires_at,
            public_expires_at,
            signing_key,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn private_expires_at(&self) -> i64 {
        self.private_expires_at
    }

    pub fn public_expires_at(&self) -> i64 {
        self.public_expires_at
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn public_key(&self) -> &PublicKey {
        self.signing_key.public_key()
    }

    /// May this pair sign at `now`?
    pub fn is_live_at(&self, now: i64) -> bool {
        self.private_expires_at >= now
    }

    /// May this pair verify at `now`?
    pub fn is_verifiable_at(&self, now: i64) -> bool {
        self.public_expires_at >= now
    }
}

/// Concurrency-safe `id -> KeyPair` map with on-demand replenishment.
///
/// Readers get `Arc<KeyPair>` snapshots, so eviction never invalidates a pair
/// that is in the middle of signing or verifying.
#[derive(Debug)]
pub struct KeyCache {
    keys: RwLock<HashMap<String, Arc<KeyPair>>>,
    min_live_keys: usize,
    key_pair_lifetime_seconds: i64,
    token_lifetime_seconds: i64,
}

impl KeyCache {
    /// Create an empty cache. Call [`KeyCache::ensure_warm`] before use.
    ///
    /// `min_live_keys == 0` is accepted here but leaves the cache unable to
    /// sign until a pair is inserted by hand.
    pub fn new(
        min_live_keys: usize,
        key_pair_lifetime_seconds: i64,
        token_lifetime_seconds: i64,
    ) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            min_live_keys,
            key_pair_lifetime_seconds,
            token_lifetime_seconds,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.min_live_keys,
            config.key_pair_lifetime_seconds,
            config.token_lifetime_seconds,
        )
    }

    pub fn min_live_keys(&self) -> usize {
        self.min_live_keys
    }

    pub fn key_pair_lifetime_seconds(&self) -> i64 {
        self.key_pair_lifetime_seconds
    }

    pub fn token_lifetime_seconds(&self) -> i64 {
        self.token_lifetime_seconds
    }

    // -------------------------------------------------------------------------
    // Replenishment
    // -------------------------------------------------------------------------

    /// Top the pool up to `min_live_keys` live pairs. Returns how many pairs
    /// were generated.
    pub async fn ensure_warm(&self) -> Result<usize, IssuerError> {
        self.ensure_warm_at(chrono::Utc::now().timestamp()).await
    }

    /// [`KeyCache::ensure_warm`] as of `now`.
    ///
    /// The count-and-generate loop runs under the write lock, so concurrent
    /// callers never generate surplus pairs.
    #[instrument(skip_all)]
    pub async fn ensure_warm_at(&self, now: i64) -> Result<usize, IssuerError> {
        {
            let keys = self.keys.read().await;
            if live_count(&keys, now) >= self.min_live_keys {
                return Ok(0);
            }
        }

        let mut keys = self.keys.write().await;
        let evicted = evict(&mut keys, now);
        if evicted > 0 {
            metrics::record_keys_evicted(evicted);
        }

        let mut generated = 0;
        while live_count(&keys, now) < self.min_live_keys {
            let pair = KeyPair::generate_at(
                now,
                self.key_pair_lifetime_seconds,
                self.token_lifetime_seconds,
            )?;

            tracing::info!(
                target: "issuer.keys",
                kid = %pair.id,
                private_expires_at = pair.private_expires_at,
                public_expires_at = pair.public_expires_at,
                "Generated signing key pair"
            );

            keys.insert(pair.id.clone(), Arc::new(pair));
            generated += 1;
        }

        if generated > 0 {
            metrics::record_keys_generated(generated);
        }
        metrics::set_live_signing_keys(live_count(&keys, now));

        Ok(generated)
    }

    // -------------------------------------------------------------------------
    // Eviction
    // -------------------------------------------------------------------------

    /// Remove every pair whose public half has expired. Returns how many were
    /// removed.
    pub async fn evict_expired(&self) -> usize {
        self.evict_expired_at(chrono::Utc::now().timestamp()).await
    }

    /// [`KeyCache::evict_expired`] as of `now`.
    pub async fn evict_expired_at(&self, now: i64) -> usize {
        {
            let keys = self.keys.read().await;
            if keys.values().all(|pair| pair.is_verifiable_at(now)) {
                return 0;
            }
        }

        let mut keys = self.keys.write().await;
        let evicted = evict(&mut keys, now);
        if evicted > 0 {
            metrics::record_keys_evicted(evicted);
            metrics::set_live_signing_keys(live_count(&keys, now));
        }
        evicted
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// The pair to sign with.
    ///
    /// Among live pairs, the one with the latest `private_expires_at` wins,
    /// ties broken by the smallest id.
    ///
    /// # Errors
    ///
    /// `IssuerError::NoSigningKeyAvailable` if no pair is live. With
    /// `min_live_keys >= 1` this only happens if key generation fails.
    pub async fn pick_signable(&self) -> Result<Arc<KeyPair>, IssuerError> {
        self.pick_signable_at(chrono::Utc::now().timestamp()).await
    }

    /// [`KeyCache::pick_signable`] as of `now`.
    #[instrument(skip_all)]
    pub async fn pick_signable_at(&self, now: i64) -> Result<Arc<KeyPair>, IssuerError> {
        self.ensure_warm_at(now).await?;
        self.evict_expired_at(now).await;

        let keys = self.keys.read().await;
        keys.values()
            .filter(|pair| pair.is_live_at(now))
            .max_by(|a, b| {
                a.private_expires_at
                    .cmp(&b.private_expires_at)
                    .then_with(|| b.id.cmp(&a.id))
            })
            .cloned()
            .ok_or_else(|| {
                tracing::warn!(target: "issuer.keys", "No live signing key available");
                IssuerError::NoSigningKeyAvailable
            })
    }

    /// Look up a pair for verification. `None` if absent or no longer
    /// verifiable.
    pub async fn lookup(&self, id: &str) -> Option<Arc<KeyPair>> {
        self.lookup_at(id, chrono::Utc::now().timestamp()).await
    }

    /// [`KeyCache::lookup`] as of `now`.
    pub async fn lookup_at(&self, id: &str, now: i64) -> Option<Arc<KeyPair>> {
        self.evict_expired_at(now).await;

        let keys = self.keys.read().await;
        keys.get(id)
            .filter(|pair| pair.is_verifiable_at(now))
            .cloned()
    }

    /// All pairs still verifiable at `now`, newest first.
    pub async fn verifiable_keys_at(&self, now: i64) -> Vec<Arc<KeyPair>> {
        self.evict_expired_at(now).await;

        let keys = self.keys.read().await;
        let mut pairs: Vec<Arc<KeyPair>> = keys
            .values()
            .filter(|pair| pair.is_verifiable_at(now))
            .cloned()
            .collect();
        pairs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        pairs
    }

    /// Number of pairs that may sign at `now`.
    pub async fn live_count_at(&self, now: i64) -> usize {
        live_count(&*self.keys.read().await, now)
    }

    /// Total number of pairs held, including verify-only ones.
    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }

    /// Insert an externally built pair, replacing any pair with the same id.
    pub async fn insert(&self, pair: KeyPair) -> Arc<KeyPair> {
        let pair = Arc::new(pair);
        self.keys
            .write()
            .await
            .insert(pair.id.clone(), Arc::clone(&pair));
        pair
    }
}

fn live_count(keys: &HashMap<String, Arc<KeyPair>>, now: i64) -> usize {
    keys.values().filter(|pair| pair.is_live_at(now)).count()
}

fn evict(keys: &mut HashMap<String, Arc<KeyPair>>, now: i64) -> usize {
    let before = keys.len();
    keys.retain(|id, pair| {
        let keep = pair.is_verifiable_at(now);
        if !keep {
            tracing::info!(
                target: "issuer.keys",
                kid = %id,
                public_expires_at = pair.public_expires_at,
                "Evicted expired key pair"
            );
        }
        keep
    });
    before - keys.len()
}
