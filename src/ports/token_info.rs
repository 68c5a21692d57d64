use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TokenMeta;

#[derive(Debug, Error)]
pub enum TokenInfoError {
    #[error("Token API request failed: {0}")]
    Http(String),
    #[error("Token API returned status {0}")]
    Status(u16),
    #[error("Failed to parse token API response: {0}")]
    Parse(String),
}

/// Off-chain descriptive metadata (name, symbol, decimals)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenInfoSource: Send + Sync {
    /// `Ok(None)` when the source does not know the mint
    async fn token_meta(&self, mint: &str) -> Result<Option<TokenMeta>, TokenInfoError>;
}
