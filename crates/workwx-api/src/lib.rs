pub mod auth;
pub mod basic;
pub mod callback;
pub mod context;

use std::sync::Arc;

use workwx_core::config::{Config, CACHE_KEY_WORK_PREFIX};
use workwx_core::error::Result;
use workwx_credential::{
    AccessTokenHandle, CacheStore, CredentialManager, HttpTokenFetcher, WorkAccount,
};

use crate::auth::Auth;
use crate::basic::Basic;
use crate::context::Context;

/// Everything needed to wire a corp application.
#[derive(Clone)]
pub struct WorkConfig {
    pub corp_id: String,
    pub corp_secret: String,
    pub agent_id: i64,
    pub cache_key_prefix: String,
    pub token_url: String,
    pub api_base: String,
    /// Required. `Work::new` rejects `None`.
    pub cache: Option<Arc<dyn CacheStore>>,
    /// HTTP client for token and API requests; a default one when `None`.
    pub http: Option<reqwest::Client>,
}

impl WorkConfig {
    pub fn from_config(config: &Config, cache: Option<Arc<dyn CacheStore>>) -> Self {
        Self {
            corp_id: config.work.corp_id.clone(),
            corp_secret: config.work.corp_secret.clone(),
            agent_id: config.work.agent_id,
            cache_key_prefix: config.cache.key_prefix.clone(),
            token_url: config.endpoints.work_token_url.clone(),
            api_base: config.endpoints.api_base.clone(),
            cache,
            http: None,
        }
    }

    /// Defaults pointing at the public corp endpoints.
    pub fn new(corp_id: impl Into<String>, corp_secret: impl Into<String>, agent_id: i64) -> Self {
        let defaults = Config::default();
        Self {
            corp_id: corp_id.into(),
            corp_secret: corp_secret.into(),
            agent_id,
            cache_key_prefix: CACHE_KEY_WORK_PREFIX.to_string(),
            token_url: defaults.endpoints.work_token_url,
            api_base: defaults.endpoints.api_base,
            cache: None,
            http: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }
}

/// Corp (work) API entry point.
pub struct Work {
    ctx: Arc<Context>,
}

impl Work {
    pub fn new(cfg: WorkConfig) -> Result<Self> {
        let account = WorkAccount::new(cfg.corp_id.clone(), cfg.corp_secret, cfg.agent_id)
            .with_endpoint(cfg.token_url);

        // Token requests and API calls share one client.
        let http = cfg.http.unwrap_or_default();

        let mut builder = CredentialManager::builder(account)
            .key_prefix(cfg.cache_key_prefix)
            .fetcher(Arc::new(HttpTokenFetcher::with_client(http.clone())));
        if let Some(cache) = cfg.cache {
            builder = builder.cache(cache);
        }
        let manager = builder.build()?;

        let ctx = Context::new(cfg.corp_id, cfg.agent_id, cfg.api_base, Arc::new(manager), http);
        Ok(Self { ctx: Arc::new(ctx) })
    }

    /// Replace the token source, e.g. with one shared across processes.
    pub fn with_token_handle(self, handle: Arc<dyn AccessTokenHandle>) -> Self {
        let ctx = self.ctx.with_token_handle(handle);
        Self { ctx: Arc::new(ctx) }
    }

    pub async fn access_token(&self) -> Result<String> {
        self.ctx.access_token().await
    }

    pub fn basic(&self) -> Basic {
        Basic::new(self.ctx.clone())
    }

    pub fn auth(&self) -> Auth {
        Auth::new(self.ctx.clone())
    }
}
