use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use workwx_core::error::{Result, WorkError};

use crate::account::{Credential, OfficialAccount, WorkAccount};
use crate::cache::CacheStore;
use crate::fetcher::{FetchedToken, HttpTokenFetcher, TokenFetcher};
use crate::AccessTokenHandle;

/// Subtracted from the vendor-reported lifetime so cached tokens are evicted
/// well before the vendor invalidates them.
pub const SAFETY_MARGIN_SECS: i64 = 1500;

pub type WorkAccessToken = CredentialManager<WorkAccount>;
pub type OfficialAccessToken = CredentialManager<OfficialAccount>;

/// Store TTL for a token the vendor says lives `expires_in` seconds.
/// Lifetimes at or under the margin map to zero (expire immediately).
pub fn cache_ttl(expires_in: i64) -> Duration {
    let secs = expires_in.saturating_sub(SAFETY_MARGIN_SECS);
    if secs <= 0 {
        Duration::ZERO
    } else {
        Duration::from_secs(secs as u64)
    }
}

/// Caches and refreshes the access token of a single account.
///
/// Every call runs under one per-instance lock, held across the vendor round
/// trip on a miss, so at most one fetch per account is ever in flight.
pub struct CredentialManager<C> {
    credential: C,
    cache_key: String,
    cache: Arc<dyn CacheStore>,
    fetcher: Arc<dyn TokenFetcher>,
    lock: Mutex<()>,
}

pub struct CredentialManagerBuilder<C> {
    credential: C,
    key_prefix: String,
    cache: Option<Arc<dyn CacheStore>>,
    fetcher: Option<Arc<dyn TokenFetcher>>,
}

impl<C: Credential> CredentialManagerBuilder<C> {
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn TokenFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Fails when no cache store was supplied.
    pub fn build(self) -> Result<CredentialManager<C>> {
        let cache = self
            .cache
            .ok_or_else(|| WorkError::Config("cache store is required".to_string()))?;
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpTokenFetcher::new()));
        let cache_key = self.credential.cache_key(&self.key_prefix);

        Ok(CredentialManager {
            credential: self.credential,
            cache_key,
            cache,
            fetcher,
            lock: Mutex::new(()),
        })
    }
}

impl<C: Credential> CredentialManager<C> {
    pub fn builder(credential: C) -> CredentialManagerBuilder<C> {
        CredentialManagerBuilder {
            credential,
            key_prefix: String::new(),
            cache: None,
            fetcher: None,
        }
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn credential(&self) -> &C {
        &self.credential
    }

    /// Cached token if present, otherwise fetched from the vendor and cached.
    pub async fn access_token(&self) -> Result<String> {
        let _guard = self.lock.lock().await;

        if let Some(token) = self.cache.get(&self.cache_key).await {
            debug!(key = %self.cache_key, "access token cache hit");
            return Ok(token);
        }

        self.refresh_locked().await
    }

    /// Fetch a new token from the vendor regardless of what is cached.
    pub async fn force_refresh(&self) -> Result<String> {
        let _guard = self.lock.lock().await;
        self.refresh_locked().await
    }

    // Caller holds `self.lock`.
    async fn refresh_locked(&self) -> Result<String> {
        let FetchedToken {
            access_token,
            expires_in,
        } = self.fetcher.fetch(&self.credential).await.map_err(|e| {
            warn!(key = %self.cache_key, error = %e, "access token fetch failed");
            e
        })?;

        let ttl = cache_ttl(expires_in);
        if ttl.is_zero() {
            warn!(
                key = %self.cache_key,
                expires_in,
                margin = SAFETY_MARGIN_SECS,
                "token lifetime within safety margin, caching with zero ttl"
            );
        }

        // A token that cannot be cached is not handed out.
        self.cache
            .set(&self.cache_key, &access_token, ttl)
            .await
            .map_err(|e| {
                warn!(key = %self.cache_key, error = %e, "access token cache write failed");
                e
            })?;

        info!(
            key = %self.cache_key,
            expires_in,
            ttl_secs = ttl.as_secs(),
            "access token refreshed"
        );
        Ok(access_token)
    }
}

#[async_trait]
impl<C: Credential> AccessTokenHandle for CredentialManager<C> {
    async fn access_token(&self) -> Result<String> {
        CredentialManager::access_token(self).await
    }
}
