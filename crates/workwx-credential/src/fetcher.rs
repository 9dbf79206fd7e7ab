use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use workwx_core::error::{Result, WorkError};
use workwx_core::types::{decode_with_error, CommonError, VendorResponse};

use crate::account::Credential;

/// A token as issued by the vendor, before any caching policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedToken {
    pub access_token: String,
    /// Lifetime reported by the vendor, in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    #[serde(flatten)]
    error: CommonError,
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

impl VendorResponse for AccessTokenResponse {
    fn common_error(&self) -> &CommonError {
        &self.error
    }
}

/// Parse a token endpoint body. A non-zero errcode fails even if a token is present.
pub fn parse_token_response(body: &str, api: &str) -> Result<FetchedToken> {
    let resp: AccessTokenResponse = decode_with_error(body, api)?;
    if resp.access_token.is_empty() {
        return Err(WorkError::Decode(format!("{api}: missing access_token")));
    }
    Ok(FetchedToken {
        access_token: resp.access_token,
        expires_in: resp.expires_in,
    })
}

/// Calls the vendor authorization endpoint for one credential.
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    async fn fetch(&self, credential: &dyn Credential) -> Result<FetchedToken>;
}

pub struct HttpTokenFetcher {
    http: reqwest::Client,
}

impl HttpTokenFetcher {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for HttpTokenFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenFetcher for HttpTokenFetcher {
    async fn fetch(&self, credential: &dyn Credential) -> Result<FetchedToken> {
        let api = credential.api_name();
        let url = credential.token_url()?;

        let resp = self
            .http
            .get(&url)
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

        let token = parse_token_response(&text, api)?;
        debug!(api, expires_in = token.expires_in, "token endpoint answered");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let token = parse_token_response(
            r#"{"errcode":0,"errmsg":"ok","access_token":"TOKEN","expires_in":7200}"#,
            "get work access_token",
        )
        .unwrap();
        assert_eq!(token.access_token, "TOKEN");
        assert_eq!(token.expires_in, 7200);
    }

    #[test]
    fn test_parse_success_without_envelope() {
        let token =
            parse_token_response(r#"{"access_token":"T","expires_in":7200}"#, "get access_token")
                .unwrap();
        assert_eq!(token.access_token, "T");
    }

    #[test]
    fn test_vendor_error_code() {
        let err = parse_token_response(
            r#"{"errcode":40001,"errmsg":"invalid credential"}"#,
            "get access_token",
        )
        .unwrap_err();
        assert!(matches!(err, WorkError::Api { code: 40001, .. }));
        assert!(err.to_string().contains("invalid credential"));
    }

    #[test]
    fn test_vendor_error_wins_over_present_token() {
        let err = parse_token_response(
            r#"{"errcode":40013,"errmsg":"invalid appid","access_token":"STALE","expires_in":7200}"#,
            "get access_token",
        )
        .unwrap_err();
        assert!(matches!(err, WorkError::Api { code: 40013, .. }));
    }

    #[test]
    fn test_missing_token_is_decode_error() {
        let err = parse_token_response(r#"{"errcode":0,"errmsg":"ok"}"#, "get access_token")
            .unwrap_err();
        assert!(matches!(err, WorkError::Decode(_)));
    }

    #[test]
    fn test_malformed_body() {
        let err = parse_token_response("not json", "get access_token").unwrap_err();
        assert!(matches!(err, WorkError::Decode(_)));
    }
}
