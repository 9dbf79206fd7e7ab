use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, WorkError};

/// Cache key prefix for official (subscription/service) accounts.
pub const CACHE_KEY_OFFICIAL_ACCOUNT_PREFIX: &str = "workwx_officialaccount_";
/// Cache key prefix for mini programs.
pub const CACHE_KEY_MINI_PROGRAM_PREFIX: &str = "workwx_miniprogram_";
/// Cache key prefix for corp (work) accounts.
pub const CACHE_KEY_WORK_PREFIX: &str = "workwx_work_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub work: WorkAccountConfig,
    #[serde(default)]
    pub official_account: OfficialAccountConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkAccountConfig {
    #[serde(default)]
    pub corp_id: String,
    #[serde(default)]
    pub corp_secret: String,
    #[serde(default)]
    pub agent_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfficialAccountConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    CACHE_KEY_WORK_PREFIX.to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_work_token_url")]
    pub work_token_url: String,
    /// Base URL for corp API calls, without a trailing slash.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_token_url() -> String {
    "https://api.weixin.qq.com/cgi-bin/token".to_string()
}

fn default_work_token_url() -> String {
    "https://qyapi.weixin.qq.com/cgi-bin/gettoken".to_string()
}

fn default_api_base() -> String {
    "https://qyapi.weixin.qq.com".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            work_token_url: default_work_token_url(),
            api_base: default_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing-subscriber` filter directive, e.g. `info` or `workwx_credential=debug`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load config: defaults → workwx.toml → env vars (env wins).
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| WorkError::Config(format!("failed to read config: {e}")))?;
            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| WorkError::Config(format!("failed to parse config: {e}")))
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("WORKWX_CORP_ID") {
            self.work.corp_id = v;
        }
        if let Some(v) = lookup("WORKWX_CORP_SECRET") {
            self.work.corp_secret = v;
        }
        if let Some(v) = lookup("WORKWX_AGENT_ID") {
            self.work.agent_id = v
                .trim()
                .parse()
                .map_err(|e| WorkError::Config(format!("invalid WORKWX_AGENT_ID {v:?}: {e}")))?;
        }
        if let Some(v) = lookup("WORKWX_APP_ID") {
            self.official_account.app_id = v;
        }
        if let Some(v) = lookup("WORKWX_APP_SECRET") {
            self.official_account.app_secret = v;
        }
        if let Some(v) = lookup("WORKWX_LOG") {
            self.log.filter = v;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.cache.key_prefix, CACHE_KEY_WORK_PREFIX);
        assert_eq!(
            config.endpoints.work_token_url,
            "https://qyapi.weixin.qq.com/cgi-bin/gettoken"
        );
        assert_eq!(config.log.filter, "info");
        assert_eq!(config.work.agent_id, 0);
    }

    #[test]
    fn test_parse_work_section() {
        let config = Config::parse(
            r#"
            [work]
            corp_id = "ww123"
            corp_secret = "s3cret"
            agent_id = 1000002

            [cache]
            key_prefix = "custom_"
            "#,
        )
        .unwrap();
        assert_eq!(config.work.corp_id, "ww123");
        assert_eq!(config.work.corp_secret, "s3cret");
        assert_eq!(config.work.agent_id, 1000002);
        assert_eq!(config.cache.key_prefix, "custom_");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::parse("[work]\ncorp_id = \"from_file\"").unwrap();
        let env: HashMap<&str, &str> = [
            ("WORKWX_CORP_ID", "from_env"),
            ("WORKWX_AGENT_ID", " 42 "),
            ("WORKWX_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.work.corp_id, "from_env");
        assert_eq!(config.work.agent_id, 42);
        assert_eq!(config.log.filter, "debug");
    }

    #[test]
    fn test_bad_agent_id_is_config_error() {
        let mut config = Config::default();
        let err = config
            .apply_env(|k| (k == "WORKWX_AGENT_ID").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, WorkError::Config(_)));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            Config::parse("[work"),
            Err(WorkError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/workwx.toml")).unwrap();
        assert_eq!(config.endpoints.api_base, "https://qyapi.weixin.qq.com");
    }
}
