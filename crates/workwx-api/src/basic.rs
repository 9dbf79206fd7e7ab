use std::sync::Arc;

use serde::Deserialize;
use workwx_core::error::Result;
use workwx_core::types::{CommonError, VendorResponse};

use crate::context::Context;

const API_DOMAIN_IP_PATH: &str = "/cgi-bin/get_api_domain_ip";
const CALLBACK_IP_PATH: &str = "/cgi-bin/getcallbackip";

#[derive(Debug, Deserialize)]
struct IpListResponse {
    #[serde(flatten)]
    error: CommonError,
    #[serde(default)]
    ip_list: Vec<String>,
}

impl VendorResponse for IpListResponse {
    fn common_error(&self) -> &CommonError {
        &self.error
    }
}

/// Server address ranges published by the vendor.
pub struct Basic {
    ctx: Arc<Context>,
}

impl Basic {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// IP ranges behind the API domain.
    pub async fn api_domain_ip(&self) -> Result<Vec<String>> {
        let resp: IpListResponse = self
            .ctx
            .get(API_DOMAIN_IP_PATH, &[], "GetWorkAPIDomainIP")
            .await?;
        Ok(resp.ip_list)
    }

    /// IP ranges the vendor sends callbacks from.
    pub async fn callback_ip(&self) -> Result<Vec<String>> {
        let resp: IpListResponse = self
            .ctx
            .get(CALLBACK_IP_PATH, &[], "GetWorkCallbackIP")
            .await?;
        Ok(resp.ip_list)
    }
}
