use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http error ({status}): {body}")]
    Http { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{api} error: errcode={code}, errmsg={message}")]
    Api {
        api: String,
        code: i64,
        message: String,
    },
    #[error("cache error: {0}")]
    Cache(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("callback error: {0}")]
    Callback(String),
}

pub type Result<T> = std::result::Result<T, WorkError>;
