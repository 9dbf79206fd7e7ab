use std::fmt;

use url::Url;
use workwx_core::error::{Result, WorkError};

const ACCESS_TOKEN_URL: &str = "https://api.weixin.qq.com/cgi-bin/token";
const WORK_ACCESS_TOKEN_URL: &str = "https://qyapi.weixin.qq.com/cgi-bin/gettoken";

/// One account's identity as the vendor sees it, plus where its token comes from.
pub trait Credential: Send + Sync + fmt::Debug {
    /// Cache key for this account's token. Distinct identities never collide.
    fn cache_key(&self, prefix: &str) -> String;

    /// Fully-formed token request URL, query included.
    fn token_url(&self) -> Result<String>;

    /// Name used when reporting vendor errors.
    fn api_name(&self) -> &'static str;
}

fn build_url(endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
    let url = Url::parse_with_params(endpoint, params)
        .map_err(|e| WorkError::Config(format!("invalid token endpoint {endpoint:?}: {e}")))?;
    Ok(url.into())
}

/// Official account or mini program: app id + secret.
#[derive(Clone)]
pub struct OfficialAccount {
    app_id: String,
    app_secret: String,
    endpoint: String,
}

impl OfficialAccount {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            endpoint: ACCESS_TOKEN_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

impl fmt::Debug for OfficialAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfficialAccount")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Credential for OfficialAccount {
    fn cache_key(&self, prefix: &str) -> String {
        format!("{prefix}_access_token_{}", self.app_id)
    }

    fn token_url(&self) -> Result<String> {
        build_url(
            &self.endpoint,
            &[
                ("grant_type", "client_credential"),
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
            ],
        )
    }

    fn api_name(&self) -> &'static str {
        "get access_token"
    }
}

/// Corp (work) application: corp id + secret, scoped to one agent.
#[derive(Clone)]
pub struct WorkAccount {
    corp_id: String,
    corp_secret: String,
    agent_id: i64,
    endpoint: String,
}

impl WorkAccount {
    pub fn new(corp_id: impl Into<String>, corp_secret: impl Into<String>, agent_id: i64) -> Self {
        Self {
            corp_id: corp_id.into(),
            corp_secret: corp_secret.into(),
            agent_id,
            endpoint: WORK_ACCESS_TOKEN_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn corp_id(&self) -> &str {
        &self.corp_id
    }

    pub fn agent_id(&self) -> i64 {
        self.agent_id
    }
}

impl fmt::Debug for WorkAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkAccount")
            .field("corp_id", &self.corp_id)
            .field("corp_secret", &"<redacted>")
            .field("agent_id", &self.agent_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Credential for WorkAccount {
    // One corp hosts many agents, each with its own token.
    fn cache_key(&self, prefix: &str) -> String {
        format!("{prefix}_access_token_{}_{}", self.corp_id, self.agent_id)
    }

    fn token_url(&self) -> Result<String> {
        build_url(
            &self.endpoint,
            &[
                ("corpid", self.corp_id.as_str()),
                ("corpsecret", self.corp_secret.as_str()),
            ],
        )
    }

    fn api_name(&self) -> &'static str {
        "get work access_token"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_official_cache_key() {
        let account = OfficialAccount::new("wx123", "secret");
        assert_eq!(
            account.cache_key("workwx_officialaccount_"),
            "workwx_officialaccount__access_token_wx123"
        );
    }

    #[test]
    fn test_work_cache_key_includes_agent() {
        let a = WorkAccount::new("ww1", "secret", 1000001);
        let b = WorkAccount::new("ww1", "secret", 1000002);
        assert_eq!(a.cache_key("p"), "p_access_token_ww1_1000001");
        assert_ne!(a.cache_key("p"), b.cache_key("p"));
    }

    #[test]
    fn test_official_token_url() {
        let account = OfficialAccount::new("wx123", "s&cret");
        assert_eq!(
            account.token_url().unwrap(),
            "https://api.weixin.qq.com/cgi-bin/token?grant_type=client_credential&appid=wx123&secret=s%26cret"
        );
    }

    #[test]
    fn test_work_token_url_with_custom_endpoint() {
        let account =
            WorkAccount::new("ww1", "abc", 7).with_endpoint("http://127.0.0.1:9000/cgi-bin/gettoken");
        assert_eq!(
            account.token_url().unwrap(),
            "http://127.0.0.1:9000/cgi-bin/gettoken?corpid=ww1&corpsecret=abc"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        let account = WorkAccount::new("ww1", "abc", 7).with_endpoint("not a url");
        assert!(matches!(account.token_url(), Err(WorkError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", WorkAccount::new("ww1", "topsecret", 7));
        assert!(!rendered.contains("topsecret"));
        assert!(rendered.contains("ww1"));
    }
}
