//! Buyer Scout
//!
//! Front-end facing operations built on the discovery pipeline: buyer
//! discovery in full and reduced form, balance lookups, the minimum-balance
//! filter and buyers common to several tokens.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::balance::balance_of;
use super::discovery::{BuyerDiscovery, DiscoveryConfig};
use crate::domain::{is_valid_token_address, DiscoveryResult, TokenMeta, WalletObservation};
use crate::ports::{ChainReader, TokenInfoSource};

/// Fewest tokens a common-buyers query accepts
pub const MIN_COMMON_TOKENS: usize = 2;

/// Most tokens a common-buyers query accepts
pub const MAX_COMMON_TOKENS: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum CommonBuyersError {
    #[error("At least 2 tokens are required, got {0}")]
    TooFewTokens(usize),
    #[error("At most 5 tokens are allowed, got {0}")]
    TooManyTokens(usize),
    #[error("Token {position} is not a valid address: {address}")]
    InvalidToken { position: usize, address: String },
    #[error("No buyers found for token {0}")]
    NoBuyers(String),
}

/// Per-token summary inside a common-buyers result
#[derive(Debug, Clone, Serialize)]
pub struct TokenBuyers {
    pub mint: String,
    pub token_meta: TokenMeta,
    pub wallet_count: usize,
}

/// Wallets that bought every queried token
#[derive(Debug, Clone, Serialize)]
pub struct CommonBuyers {
    /// Ordered by position in the first token's result
    pub wallets: Vec<String>,
    pub tokens: Vec<TokenBuyers>,
}

impl CommonBuyers {
    /// Share of the smaller of the first two buyer sets that is common, in percent
    pub fn overlap_rate(&self) -> f64 {
        let smallest = self
            .tokens
            .iter()
            .take(2)
            .map(|t| t.wallet_count)
            .min()
            .unwrap_or(0);
        if smallest == 0 {
            return 0.0;
        }
        self.wallets.len() as f64 / smallest as f64 * 100.0
    }
}

pub struct BuyerScout {
    chain: Arc<dyn ChainReader>,
    discovery: BuyerDiscovery,
}

impl BuyerScout {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        token_info: Option<Arc<dyn TokenInfoSource>>,
        config: DiscoveryConfig,
    ) -> Self {
        let discovery = BuyerDiscovery::new(Arc::clone(&chain), token_info, config);
        Self { chain, discovery }
    }

    /// Full discovery: ordered observations, metadata, status and stats
    pub async fn discover_buyers(&self, mint: &str) -> DiscoveryResult {
        self.discovery.discover(mint).await
    }

    /// Reduced form for callers that ignore balances
    pub async fn discover_wallets(&self, mint: &str) -> (Vec<String>, TokenMeta) {
        self.discover_buyers(mint).await.into_wallets()
    }

    pub async fn balance_of(&self, address: &str) -> f64 {
        balance_of(self.chain.as_ref(), address).await
    }

    /// Keep observations holding at least `min_sol`. Order is preserved and a
    /// non-positive minimum disables the filter.
    pub fn retain_min_balance(observations: Vec<WalletObservation>, min_sol: f64) -> Vec<WalletObservation> {
        if min_sol <= 0.0 {
            return observations;
        }
        observations
            .into_iter()
            .filter(|o| o.balance_sol >= min_sol)
            .collect()
    }

    /// Look up balances for bare wallet addresses and keep those holding at
    /// least `min_sol`, in input order.
    pub async fn filter_wallets_by_balance(&self, wallets: &[String], min_sol: f64) -> Vec<(String, f64)> {
        let mut kept = Vec::with_capacity(wallets.len());
        for wallet in wallets {
            let balance = self.balance_of(wallet).await;
            if min_sol <= 0.0 || balance >= min_sol {
                kept.push((wallet.clone(), balance));
            }
        }
        kept
    }

    /// Wallets found among the buyers of every token in `mints`.
    ///
    /// Discovery runs sequentially per token. Balance filters do not apply.
    pub async fn common_buyers(&self, mints: &[String]) -> Result<CommonBuyers, CommonBuyersError> {
        if mints.len() < MIN_COMMON_TOKENS {
            return Err(CommonBuyersError::TooFewTokens(mints.len()));
        }
        if mints.len() > MAX_COMMON_TOKENS {
            return Err(CommonBuyersError::TooManyTokens(mints.len()));
        }
        if let Some((index, mint)) = mints
            .iter()
            .enumerate()
            .find(|(_, mint)| !is_valid_token_address(mint))
        {
            return Err(CommonBuyersError::InvalidToken {
                position: index + 1,
                address: mint.clone(),
            });
        }

        let mut ordered: Vec<String> = Vec::new();
        let mut common: HashSet<String> = HashSet::new();
        let mut tokens = Vec::with_capacity(mints.len());

        for (index, mint) in mints.iter().enumerate() {
            tracing::info!("Processing token {}/{}: {}", index + 1, mints.len(), mint);
            let (wallets, token_meta) = self.discover_wallets(mint).await;
            if wallets.is_empty() {
                return Err(CommonBuyersError::NoBuyers(mint.clone()));
            }

            if index == 0 {
                common = wallets.iter().cloned().collect();
                ordered = wallets.clone();
            } else {
                let current: HashSet<&String> = wallets.iter().collect();
                common.retain(|w| current.contains(w));
            }

            tokens.push(TokenBuyers {
                mint: mint.clone(),
                token_meta,
                wallet_count: wallets.len(),
            });
        }

        ordered.retain(|w| common.contains(w));
        tracing::info!("Found {} common wallets across {} tokens", ordered.len(), mints.len());

        Ok(CommonBuyers {
            wallets: ordered,
            tokens,
        })
    }
}
