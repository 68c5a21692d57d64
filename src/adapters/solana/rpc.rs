//! Typed Solana JSON-RPC client over the resilient executor.
//!
//! Each `ChainReader` method is a single executor call followed by decoding
//! the `result` payload.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use solana_client::rpc_request::RpcRequest;
use solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature;
use solana_sdk::native_token::LAMPORTS_PER_SOL;

use async_trait::async_trait;

use super::executor::RpcExecutor;
use super::types::{
    AccountData, AccountInfoValue, AccountKey, ContextValue, TokenAccountBalance, TokenAmount,
    TransactionResult,
};
use crate::domain::{EndpointTier, TokenMeta};
use crate::ports::{ChainReader, HolderAccount, RpcError, SignatureInfo};

/// Chain reader backed by `RpcExecutor`
#[derive(Clone)]
pub struct SolanaRpcClient {
    executor: RpcExecutor,
}

impl SolanaRpcClient {
    pub fn new(executor: RpcExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &RpcExecutor {
        &self.executor
    }

    /// Balance in SOL. Fails like any other call; callers that need the
    /// zero-on-failure behaviour go through the balance oracle.
    pub async fn balance_sol(&self, address: &str) -> Result<f64, RpcError> {
        let lamports = self.balance_lamports(address).await?;
        Ok(lamports as f64 / LAMPORTS_PER_SOL as f64)
    }

    async fn call<T: DeserializeOwned>(&self, request: RpcRequest, params: Value) -> Result<T, RpcError> {
        let result = self.executor.execute(request, params).await?;
        decode(request, result)
    }
}

fn decode<T: DeserializeOwned>(request: RpcRequest, result: Value) -> Result<T, RpcError> {
    serde_json::from_value(result).map_err(|e| RpcError::Decode {
        method: request.to_string(),
        message: e.to_string(),
    })
}

/// Decimals and raw supply from a jsonParsed mint account
fn parse_mint_account(mint: &str, value: AccountInfoValue) -> Option<TokenMeta> {
    let parsed = match value.data {
        AccountData::Parsed(parsed) => parsed,
        AccountData::Raw(_) => {
            tracing::debug!("Account {} returned raw data, not a parsed mint", mint);
            return None;
        }
    };

    if parsed.parsed.account_type != "mint" {
        tracing::debug!(
            "Account {} is '{}', expected 'mint'",
            mint,
            parsed.parsed.account_type
        );
        return None;
    }

    let info = parsed.parsed.info;
    Some(TokenMeta {
        decimals: Some(info.decimals),
        supply: info.supply.parse().ok(),
        ..Default::default()
    })
}

#[async_trait]
impl ChainReader for SolanaRpcClient {
    fn active_tier(&self) -> EndpointTier {
        self.executor.pool().active_tier()
    }

    async fn token_largest_accounts(&self, mint: &str) -> Result<Vec<HolderAccount>, RpcError> {
        let page: Option<ContextValue<Vec<TokenAccountBalance>>> = self
            .call(
                RpcRequest::GetTokenLargestAccounts,
                json!([mint, {"commitment": "confirmed"}]),
            )
            .await?;

        Ok(page
            .map(|p| p.value)
            .unwrap_or_default()
            .into_iter()
            .map(|account| HolderAccount {
                address: account.address,
                ui_amount: account.ui_amount,
            })
            .collect())
    }

    async fn mint_info(&self, mint: &str) -> Result<Option<TokenMeta>, RpcError> {
        let account: Option<ContextValue<Option<AccountInfoValue>>> = self
            .call(
                RpcRequest::GetAccountInfo,
                json!([mint, {"encoding": "jsonParsed", "commitment": "confirmed"}]),
            )
            .await?;

        Ok(account
            .and_then(|a| a.value)
            .and_then(|value| parse_mint_account(mint, value)))
    }

    async fn token_supply(&self, mint: &str) -> Result<Option<TokenMeta>, RpcError> {
        let supply: Option<ContextValue<TokenAmount>> =
            self.call(RpcRequest::GetTokenSupply, json!([mint])).await?;

        Ok(supply.map(|s| TokenMeta {
            decimals: Some(s.value.decimals),
            supply: s.value.amount.parse().ok(),
            ..Default::default()
        }))
    }

    async fn signatures_for_address(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        let statuses: Option<Vec<RpcConfirmedTransactionStatusWithSignature>> = self
            .call(
                RpcRequest::GetSignaturesForAddress,
                json!([address, {"limit": limit, "commitment": "confirmed"}]),
            )
            .await?;

        Ok(statuses
            .unwrap_or_default()
            .into_iter()
            .map(|status| SignatureInfo {
                signature: status.signature,
                block_time: status.block_time,
            })
            .collect())
    }

    async fn transaction_account_keys(&self, signature: &str) -> Result<Option<Vec<String>>, RpcError> {
        let tx: Option<TransactionResult> = self
            .call(
                RpcRequest::GetTransaction,
                json!([signature, {
                    "encoding": "json",
                    "commitment": "confirmed",
                    "maxSupportedTransactionVersion": 0
                }]),
            )
            .await?;

        Ok(tx.map(|tx| {
            tx.transaction
                .message
                .account_keys
                .iter()
                .map(AccountKey::pubkey)
                .map(str::to_string)
                .collect()
        }))
    }

    async fn balance_lamports(&self, address: &str) -> Result<u64, RpcError> {
        let balance: ContextValue<u64> = self.call(RpcRequest::GetBalance, json!([address])).await?;
        Ok(balance.value)
    }
}
