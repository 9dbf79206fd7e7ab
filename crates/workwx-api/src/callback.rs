use std::sync::Arc;

use tracing::debug;
use url::form_urlencoded;
use workwx_core::error::{Result, WorkError};

/// Signature check and decryption for inbound callbacks.
pub trait MessageCrypt: Send + Sync {
    /// Verify `signature` over the payload and return the decrypted plaintext.
    fn verify(&self, signature: &str, timestamp: &str, nonce: &str, payload: &[u8])
        -> Result<Vec<u8>>;
}

/// Query parameters the vendor attaches to every callback request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackQuery {
    pub msg_signature: String,
    pub timestamp: String,
    pub nonce: String,
    pub echostr: String,
}

impl CallbackQuery {
    /// Parse a raw query string; values are percent-decoded.
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "msg_signature" => parsed.msg_signature = value.into_owned(),
                "timestamp" => parsed.timestamp = value.into_owned(),
                "nonce" => parsed.nonce = value.into_owned(),
                "echostr" => parsed.echostr = value.into_owned(),
                _ => {}
            }
        }
        parsed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackPayload {
    /// URL verification handshake; reply with these bytes.
    Echo(Vec<u8>),
    /// Decrypted message body.
    Message(Vec<u8>),
    Empty,
}

pub struct Callback {
    crypt: Arc<dyn MessageCrypt>,
}

impl Callback {
    pub fn new(crypt: Arc<dyn MessageCrypt>) -> Self {
        Self { crypt }
    }

    /// Validate an inbound request and decrypt whatever it carries.
    pub fn check_request(&self, query: &CallbackQuery, body: &[u8]) -> Result<CallbackPayload> {
        if query.msg_signature.is_empty() || query.timestamp.is_empty() || query.nonce.is_empty() {
            return Err(WorkError::Callback(
                "missing required parameters".to_string(),
            ));
        }

        if !query.echostr.is_empty() {
            debug!("callback url verification");
            let echo = self.crypt.verify(
                &query.msg_signature,
                &query.timestamp,
                &query.nonce,
                query.echostr.as_bytes(),
            )?;
            return Ok(CallbackPayload::Echo(echo));
        }

        if body.is_empty() {
            return Ok(CallbackPayload::Empty);
        }

        let plaintext =
            self.crypt
                .verify(&query.msg_signature, &query.timestamp, &query.nonce, body)?;
        Ok(CallbackPayload::Message(plaintext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts signature "good" and reverses the payload.
    struct ReverseCrypt;

    impl MessageCrypt for ReverseCrypt {
        fn verify(
            &self,
            signature: &str,
            _timestamp: &str,
            _nonce: &str,
            payload: &[u8],
        ) -> Result<Vec<u8>> {
            if signature != "good" {
                return Err(WorkError::Callback("signature mismatch".to_string()));
            }
            Ok(payload.iter().rev().copied().collect())
        }
    }

    fn callback() -> Callback {
        Callback::new(Arc::new(ReverseCrypt))
    }

    #[test]
    fn test_parse_decodes_echostr() {
        let q = CallbackQuery::parse("msg_signature=good&timestamp=1&nonce=n&echostr=a%2Bb%3D&x=y");
        assert_eq!(q.msg_signature, "good");
        assert_eq!(q.echostr, "a+b=");
    }

    #[test]
    fn test_missing_params_rejected() {
        let q = CallbackQuery::parse("timestamp=1&nonce=n");
        let err = callback().check_request(&q, b"").unwrap_err();
        assert!(err.to_string().contains("missing required parameters"));
    }

    #[test]
    fn test_echo_handshake() {
        let q = CallbackQuery::parse("msg_signature=good&timestamp=1&nonce=n&echostr=abc");
        assert_eq!(
            callback().check_request(&q, b"ignored").unwrap(),
            CallbackPayload::Echo(b"cba".to_vec())
        );
    }

    #[test]
    fn test_message_body_decrypted() {
        let q = CallbackQuery::parse("msg_signature=good&timestamp=1&nonce=n");
        assert_eq!(
            callback().check_request(&q, b"xml").unwrap(),
            CallbackPayload::Message(b"lmx".to_vec())
        );
    }

    #[test]
    fn test_empty_body() {
        let q = CallbackQuery::parse("msg_signature=good&timestamp=1&nonce=n");
        assert_eq!(callback().check_request(&q, b"").unwrap(), CallbackPayload::Empty);
    }

    #[test]
    fn test_bad_signature_propagates() {
        let q = CallbackQuery::parse("msg_signature=bad&timestamp=1&nonce=n");
        assert!(matches!(
            callback().check_request(&q, b"xml"),
            Err(WorkError::Callback(_))
        ));
    }
}
