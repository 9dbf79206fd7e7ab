use std::sync::Arc;

use serde::de::DeserializeOwned;
use url::Url;
use workwx_core::error::{Result, WorkError};
use workwx_core::types::{decode_with_error, VendorResponse};
use workwx_credential::AccessTokenHandle;

/// State shared by every corp API client.
#[derive(Clone)]
pub struct Context {
    corp_id: String,
    agent_id: i64,
    api_base: String,
    token: Arc<dyn AccessTokenHandle>,
    http: reqwest::Client,
}

impl Context {
    pub fn new(
        corp_id: String,
        agent_id: i64,
        api_base: String,
        token: Arc<dyn AccessTokenHandle>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            corp_id,
            agent_id,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            http,
        }
    }

    pub fn with_token_handle(&self, token: Arc<dyn AccessTokenHandle>) -> Self {
        Self {
            token,
            ..self.clone()
        }
    }

    pub fn corp_id(&self) -> &str {
        &self.corp_id
    }

    pub fn agent_id(&self) -> i64 {
        self.agent_id
    }

    pub async fn access_token(&self) -> Result<String> {
        self.token.access_token().await
    }

    /// GET `path` with a fresh access token, decode, and check errcode.
    pub(crate) async fn get<T>(&self, path: &str, query: &[(&str, &str)], api: &str) -> Result<T>
    where
        T: DeserializeOwned + VendorResponse,
    {
        let token = self.access_token().await?;

        let mut url = Url::parse(&format!("{}{path}", self.api_base))
            .map_err(|e| WorkError::Config(format!("invalid api url for {api}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("access_token", &token)
            .extend_pairs(query);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| WorkError::Transport(format!("{api} request failed: {e}")))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| WorkError::Transport(format!("{api} response read failed: {e}")))?;

        if status != 200 {
            return Err(WorkError::Http { status, body: text });
        }

        decode_with_error(&text, api)
    }
}
