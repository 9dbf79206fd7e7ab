use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use workwx_api::{Work, WorkConfig};
use workwx_core::config::{Config, CACHE_KEY_OFFICIAL_ACCOUNT_PREFIX};
use workwx_core::error::{Result, WorkError};
use workwx_credential::{CacheStore, CredentialManager, MemoryCache, OfficialAccount};

#[tokio::main]
async fn main() {
    let config_path =
        std::env::var("WORKWX_CONFIG").unwrap_or_else(|_| "workwx.toml".to_string());

    let config = match Config::load(Path::new(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            // Logging is not up yet.
            eprintln!("fatal: failed to load config: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config.log.filter);

    if let Err(e) = run(&config).await {
        error!(error = %e, "fatal");
        std::process::exit(1);
    }
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

async fn run(config: &Config) -> Result<()> {
    if config.work.corp_id.is_empty() || config.work.corp_secret.is_empty() {
        return Err(WorkError::Config(
            "WORKWX_CORP_ID and WORKWX_CORP_SECRET must be set".to_string(),
        ));
    }

    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
    let work = Work::new(WorkConfig::from_config(config, Some(cache.clone())))?;

    info!(
        corp_id = %config.work.corp_id,
        agent_id = config.work.agent_id,
        "workwx: starting"
    );

    work.access_token().await?;

    let ips = work.basic().callback_ip().await?;
    info!(count = ips.len(), "callback ip ranges fetched");
    for ip in ips {
        println!("{ip}");
    }

    if !config.official_account.app_id.is_empty() {
        let account = OfficialAccount::new(
            config.official_account.app_id.clone(),
            config.official_account.app_secret.clone(),
        )
        .with_endpoint(config.endpoints.token_url.clone());
        let official = CredentialManager::builder(account)
            .key_prefix(CACHE_KEY_OFFICIAL_ACCOUNT_PREFIX)
            .cache(cache)
            .build()?;
        official.access_token().await?;
        info!(app_id = %official.credential().app_id(), "official account token ready");
    }

    Ok(())
}
