use std::sync::Arc;

use serde::Deserialize;
use url::Url;
use workwx_core::error::{Result, WorkError};
use workwx_core::types::{CommonError, VendorResponse};

use crate::context::Context;

const WEB_APP_AUTH_URL: &str = "https://open.weixin.qq.com/connect/oauth2/authorize";
const QR_APP_AUTH_URL: &str = "https://open.work.weixin.qq.com/wwopen/sso/qrConnect";
const USER_INFO_PATH: &str = "/cgi-bin/user/getuserinfo";

/// Identity of the user behind an OAuth `code`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(flatten)]
    pub error: CommonError,
    /// Member id; empty for non-members.
    #[serde(rename = "UserId", default)]
    pub user_id: String,
    /// Set for non-members, unique within the corp.
    #[serde(rename = "OpenId", default)]
    pub open_id: String,
    /// Only present for the web app flow.
    #[serde(rename = "DeviceId", default)]
    pub device_id: String,
}

impl VendorResponse for UserInfo {
    fn common_error(&self) -> &CommonError {
        &self.error
    }
}

pub struct Auth {
    ctx: Arc<Context>,
}

impl Auth {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Authorization URL for the in-app (web) login flow.
    pub fn web_app_redirect_url(&self, redirect_uri: &str, state: &str) -> Result<String> {
        let mut url = Url::parse_with_params(
            WEB_APP_AUTH_URL,
            &[
                ("appid", self.ctx.corp_id()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", "snsapi_base"),
                ("state", state),
            ],
        )
        .map_err(|e| WorkError::Config(format!("invalid web app auth url: {e}")))?;
        url.set_fragment(Some("wechat_redirect"));
        Ok(url.into())
    }

    /// Authorization URL for the QR-code login flow.
    pub fn qr_app_redirect_url(&self, redirect_uri: &str, state: &str) -> Result<String> {
        let agent_id = self.ctx.agent_id().to_string();
        let url = Url::parse_with_params(
            QR_APP_AUTH_URL,
            &[
                ("appid", self.ctx.corp_id()),
                ("agentid", agent_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("state", state),
            ],
        )
        .map_err(|e| WorkError::Config(format!("invalid qr auth url: {e}")))?;
        Ok(url.into())
    }

    pub async fn user_info(&self, code: &str) -> Result<UserInfo> {
        self.ctx
            .get(USER_INFO_PATH, &[("code", code)], "GetUserInfo")
            .await
    }
}
