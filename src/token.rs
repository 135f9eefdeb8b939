use async_trait::async_trait;

use crate::error::Result;

/// Source of bearer tokens for the cloud API. OAuth2 acquisition and
/// refresh live outside this crate; the client only asks for a token and,
/// after a 401, for a fresh one.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A token believed to be valid right now.
    async fn access_token(&self) -> Result<String>;

    /// Called after the API rejected the current token. Returns the
    /// replacement token.
    async fn refresh(&self) -> Result<String>;
}

/// Fixed token, for demos and tests. `refresh` hands back the same token,
/// so a rejected static token surfaces as an auth failure on the retry.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        StaticTokenProvider {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }

    async fn refresh(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
