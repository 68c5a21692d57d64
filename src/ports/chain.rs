use async_trait::async_trait;
use serde::Serialize;

use super::RpcError;
use crate::domain::{EndpointTier, TokenMeta};

/// One entry of getTokenLargestAccounts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HolderAccount {
    pub address: String,
    pub ui_amount: Option<f64>,
}

/// One entry of getSignaturesForAddress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub signature: String,
    pub block_time: Option<i64>,
}

/// Typed chain reads the discovery pipeline depends on.
///
/// Every method is one logical RPC call. `Ok(None)` means the node answered
/// with a null result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Tier of the endpoint the next call would be sent to
    fn active_tier(&self) -> EndpointTier;

    async fn token_largest_accounts(&self, mint: &str) -> Result<Vec<HolderAccount>, RpcError>;

    /// Decimals and supply from the parsed mint account
    async fn mint_info(&self, mint: &str) -> Result<Option<TokenMeta>, RpcError>;

    /// Decimals and supply from getTokenSupply
    async fn token_supply(&self, mint: &str) -> Result<Option<TokenMeta>, RpcError>;

    /// Newest-first signature page for an address
    async fn signatures_for_address(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, RpcError>;

    /// Message account keys of a transaction, in message order
    async fn transaction_account_keys(&self, signature: &str) -> Result<Option<Vec<String>>, RpcError>;

    async fn balance_lamports(&self, address: &str) -> Result<u64, RpcError>;
}
