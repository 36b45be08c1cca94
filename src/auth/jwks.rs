// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Refresh Policy
//!
//! The key set is fetched lazily on first use and then held in memory. How
//! long it is trusted is explicit in [`RefreshPolicy`]:
//!
//! - `ttl = None` keeps the first fetched set for the life of the process;
//!   a key rotation at the provider needs a restart.
//! - `refetch_on_miss = false` fails an unknown `kid` immediately with
//!   `UnknownSigningKey` instead of going back to the network mid-request.
//!
//! Both default to the fail-fast behaviour and can be relaxed by
//! configuration.
//!
//! ## Security
//!
//! - Only asymmetric signature keys are loaded (RSA, EC); `oct` keys and
//!   `use = "enc"` keys are skipped.
//! - The verification algorithm comes from the JWK, never from the token.
//! - Fetches carry a short timeout and are not retried; failure denies the
//!   request.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;

use super::error::AuthError;

/// Default timeout for the JWKS HTTP fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the signing-key set comes from.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch the current key set.
    async fn fetch(&self) -> Result<JwkSet, AuthError>;

    /// Human-readable origin, for logs and health output.
    fn describe(&self) -> String;
}

/// Fetches the key set from the provider's published endpoint.
pub struct HttpKeySource {
    url: String,
    client: reqwest::Client,
}

impl HttpKeySource {
    /// Create a source for the given JWKS URL.
    ///
    /// # Arguments
    /// - `url`: e.g. `https://login.example.com/realms/kit/protocol/openid-connect/certs`
    /// - `timeout`: applied to the whole request; there is no retry
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeySetUnavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// A fixed key set, loaded from a file or built in memory.
pub struct StaticKeySource {
    jwks: JwkSet,
    origin: String,
    fetches: AtomicUsize,
}

impl StaticKeySource {
    pub fn new(jwks: JwkSet) -> Self {
        Self {
            jwks,
            origin: "static".to_string(),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Load a JWKS document from disk.
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuthError::KeySetUnavailable(format!("Failed to read {}: {e}", path.display()))
        })?;
        let jwks: JwkSet = serde_json::from_str(&content).map_err(|e| {
            AuthError::KeySetUnavailable(format!("Invalid JWKS in {}: {e}", path.display()))
        })?;
        Ok(Self {
            origin: path.display().to_string(),
            ..Self::new(jwks)
        })
    }

    /// How many times the set has been handed out.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.jwks.clone())
    }

    fn describe(&self) -> String {
        self.origin.clone()
    }
}

/// How long a fetched key set is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshPolicy {
    /// Refetch once the cached set is older than this. `None` = never.
    pub ttl: Option<Duration>,
    /// On an unknown `kid`, refetch once before failing.
    pub refetch_on_miss: bool,
}

/// A verification key ready for jsonwebtoken.
#[derive(Clone)]
pub struct SigningKey {
    pub key: DecodingKey,
    pub algorithm: Algorithm,
}

struct CacheEntry {
    keys: Arc<HashMap<String, SigningKey>>,
    fetched_at: Instant,
}

/// JWKS manager with caching.
#[derive(Clone)]
pub struct JwksManager {
    source: Arc<dyn KeySource>,
    policy: RefreshPolicy,
    cache: Arc<RwLock<Option<CacheEntry>>>,
}

impl JwksManager {
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self {
            source,
            policy: RefreshPolicy::default(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn source(&self) -> String {
        self.source.describe()
    }

    /// Current key ring, fetching it if absent or expired.
    async fn keys(&self) -> Result<Arc<HashMap<String, SigningKey>>, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                let fresh = self
                    .policy
                    .ttl
                    .map_or(true, |ttl| entry.fetched_at.elapsed() < ttl);
                if fresh {
                    return Ok(entry.keys.clone());
                }
            }
        }

        self.refresh().await
    }

    /// Fetch the key set from the source and replace the cache.
    pub async fn refresh(&self) -> Result<Arc<HashMap<String, SigningKey>>, AuthError> {
        let jwks = self.source.fetch().await?;
        let keys = Arc::new(key_ring(&jwks));
        tracing::info!(
            source = %self.source.describe(),
            keys = keys.len(),
            "Loaded signing keys"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }

    /// Get the verification key for the given key ID.
    pub async fn get_signing_key(&self, kid: &str) -> Result<SigningKey, AuthError> {
        let keys = self.keys().await?;
        if let Some(key) = keys.get(kid) {
            return Ok(key.clone());
        }

        if self.policy.refetch_on_miss {
            tracing::info!(kid = %kid, "Unknown signing key, refetching key set once");
            let keys = self.refresh().await?;
            if let Some(key) = keys.get(kid) {
                return Ok(key.clone());
            }
        }

        Err(AuthError::UnknownSigningKey(kid.to_string()))
    }

    /// Check if a key set is currently cached and within its TTL.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        match &*cache {
            Some(entry) => self
                .policy
                .ttl
                .map_or(true, |ttl| entry.fetched_at.elapsed() < ttl),
            None => false,
        }
    }
}

/// Convert every usable JWK into a verification key indexed by `kid`.
fn key_ring(jwks: &JwkSet) -> HashMap<String, SigningKey> {
    let mut keys = HashMap::new();
    for jwk in &jwks.keys {
        let Some(kid) = jwk.common.key_id.clone() else {
            tracing::warn!("Skipping JWK without kid");
            continue;
        };
        match jwk_to_signing_key(jwk) {
            Ok(key) => {
                keys.insert(kid, key);
            }
            Err(reason) => tracing::debug!(kid = %kid, reason = %reason, "Skipping JWK"),
        }
    }
    keys
}

/// Convert a JWK to a SigningKey.
fn jwk_to_signing_key(jwk: &Jwk) -> Result<SigningKey, String> {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return Err("encryption key".to_string());
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let algorithm = match jwk.common.key_algorithm.as_ref() {
                None | Some(KeyAlgorithm::RS256) => Algorithm::RS256,
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                Some(KeyAlgorithm::PS256) => Algorithm::PS256,
                Some(KeyAlgorithm::PS384) => Algorithm::PS384,
                Some(KeyAlgorithm::PS512) => Algorithm::PS512,
                Some(other) => return Err(format!("unsupported RSA algorithm {other:?}")),
            };
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| format!("invalid RSA key: {e}"))?;
            Ok(SigningKey { key, algorithm })
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let algorithm = match jwk.common.key_algorithm.as_ref() {
                None | Some(KeyAlgorithm::ES256) => Algorithm::ES256,
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                Some(other) => return Err(format!("unsupported EC algorithm {other:?}")),
            };
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| format!("invalid EC key: {e}"))?;
            Ok(SigningKey { key, algorithm })
        }
        _ => Err("unsupported key type".to_string()),
    }
}
