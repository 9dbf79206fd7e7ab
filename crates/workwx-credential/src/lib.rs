pub mod account;
pub mod cache;
pub mod fetcher;
pub mod manager;

use async_trait::async_trait;
use workwx_core::error::Result;

pub use account::{Credential, OfficialAccount, WorkAccount};
pub use cache::{CacheStore, MemoryCache};
pub use fetcher::{FetchedToken, HttpTokenFetcher, TokenFetcher};
pub use manager::{CredentialManager, OfficialAccessToken, WorkAccessToken};

/// Source of a valid access token for outbound API calls.
/// [`CredentialManager`] is the default; embedders may supply their own.
#[async_trait]
pub trait AccessTokenHandle: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}
