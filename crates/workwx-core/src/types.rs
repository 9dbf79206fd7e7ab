use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkError};

/// Error pair carried by every vendor JSON response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonError {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl CommonError {
    /// A non-zero `errcode` is a failure no matter what else the payload holds.
    pub fn check(&self, api: &str) -> Result<()> {
        if self.errcode != 0 {
            return Err(WorkError::Api {
                api: api.to_string(),
                code: self.errcode,
                message: self.errmsg.clone(),
            });
        }
        Ok(())
    }
}

/// Implemented by response structs that flatten a [`CommonError`].
pub trait VendorResponse {
    fn common_error(&self) -> &CommonError;
}

/// Parse a vendor response body and turn a non-zero `errcode` into an error.
pub fn decode_with_error<T>(body: &str, api: &str) -> Result<T>
where
    T: DeserializeOwned + VendorResponse,
{
    let resp: T = serde_json::from_str(body)
        .map_err(|e| WorkError::Decode(format!("{api} response parse failed: {e}")))?;
    resp.common_error().check(api)?;
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct IpList {
        #[serde(flatten)]
        error: CommonError,
        #[serde(default)]
        ip_list: Vec<String>,
    }

    impl VendorResponse for IpList {
        fn common_error(&self) -> &CommonError {
            &self.error
        }
    }

    #[test]
    fn test_zero_errcode_with_ok_message_passes() {
        let resp: IpList =
            decode_with_error(r#"{"errcode":0,"errmsg":"ok","ip_list":["1.1.1.1"]}"#, "GetIP")
                .unwrap();
        assert_eq!(resp.ip_list, vec!["1.1.1.1"]);
    }

    #[test]
    fn test_missing_envelope_defaults_to_success() {
        let resp: IpList = decode_with_error(r#"{"ip_list":[]}"#, "GetIP").unwrap();
        assert_eq!(resp.error, CommonError::default());
    }

    #[test]
    fn test_nonzero_errcode_is_api_error() {
        let err = decode_with_error::<IpList>(
            r#"{"errcode":40014,"errmsg":"invalid access_token"}"#,
            "GetIP",
        )
        .unwrap_err();
        match err {
            WorkError::Api { api, code, message } => {
                assert_eq!(api, "GetIP");
                assert_eq!(code, 40014);
                assert_eq!(message, "invalid access_token");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let err = decode_with_error::<IpList>("<html>", "GetIP").unwrap_err();
        assert!(matches!(err, WorkError::Decode(_)));
    }
}
