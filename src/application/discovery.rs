//! Buyer Discovery Pipeline
//!
//! One sequential scan per invocation:
//! metadata -> largest holders -> scan plan -> per-account signatures ->
//! per-signature transaction -> classify, dedup, balance -> deterministic sort.
//!
//! Per-account and per-signature failures are logged and skipped. Only holder
//! enumeration can fail the whole run. Every RPC call and pause is bounded by
//! the per-invocation deadline; once it passes, whatever was accumulated is
//! sorted and returned.

use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;
use tokio::time::Instant;

use super::balance::balance_of;
use crate::domain::{
    is_user_wallet, sort_observations, stage_pause, DiscoveryResult, DiscoveryStats,
    DiscoveryStatus, EndpointTier, PacingConfig, ScanPlan, SignatureRecord, Stage, TierBudget,
    TokenMeta, WalletObservation,
};
use crate::ports::{ChainReader, HolderAccount, RpcError, TokenInfoSource};

/// Errors internal to a scan. They never escape `discover`.
#[derive(Debug, Error)]
enum DiscoveryError {
    #[error("RPC call failed: {0}")]
    Rpc(RpcError),
    #[error("Discovery deadline exceeded")]
    DeadlineExceeded,
}

impl From<RpcError> for DiscoveryError {
    fn from(error: RpcError) -> Self {
        match error {
            RpcError::DeadlineExceeded => DiscoveryError::DeadlineExceeded,
            other => DiscoveryError::Rpc(other),
        }
    }
}

/// Whether the scan should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    BudgetReached,
}

/// Discovery settings
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Target number of wallets per discovery
    pub max_wallets: usize,
    /// Leading account keys of each transaction treated as candidates
    pub candidates_per_transaction: usize,
    /// Per-invocation deadline
    pub deadline: Duration,
    pub pacing: PacingConfig,
    pub public_budget: TierBudget,
    pub premium_budget: TierBudget,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_wallets: 50,
            candidates_per_transaction: 3,
            deadline: Duration::from_secs(300),
            pacing: PacingConfig::default(),
            public_budget: TierBudget::public(),
            premium_budget: TierBudget::premium(),
        }
    }
}

impl DiscoveryConfig {
    pub fn budget_for(&self, tier: EndpointTier) -> &TierBudget {
        match tier {
            EndpointTier::Public => &self.public_budget,
            EndpointTier::Premium => &self.premium_budget,
        }
    }
}

/// Mutable state of one invocation
struct Scan<'a> {
    mint: &'a str,
    tier: EndpointTier,
    deadline: Instant,
    plan: ScanPlan,
    seen: HashSet<String>,
    observations: Vec<WalletObservation>,
    stats: DiscoveryStats,
}

pub struct BuyerDiscovery {
    chain: Arc<dyn ChainReader>,
    token_info: Option<Arc<dyn TokenInfoSource>>,
    config: DiscoveryConfig,
}

impl BuyerDiscovery {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        token_info: Option<Arc<dyn TokenInfoSource>>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            chain,
            token_info,
            config,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Discover the earliest buyers of `mint`. Never fails: an empty result
    /// with a status explains why nothing was found.
    pub async fn discover(&self, mint: &str) -> DiscoveryResult {
        match AssertUnwindSafe(self.run(mint)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Discovery for {} aborted unexpectedly", mint);
                DiscoveryResult::empty(
                    TokenMeta::default(),
                    DiscoveryStatus::Failed,
                    DiscoveryStats::default(),
                )
            }
        }
    }

    async fn run(&self, mint: &str) -> DiscoveryResult {
        let tier = self.chain.active_tier();
        let mut scan = Scan {
            mint,
            tier,
            deadline: deadline_after(self.config.deadline),
            plan: ScanPlan::new(self.config.budget_for(tier), 0, 0, 1),
            seen: HashSet::new(),
            observations: Vec::new(),
            stats: DiscoveryStats::default(),
        };

        tracing::info!("Discovering buyers of {} ({:?} endpoint)", mint, tier);

        let token_meta = self.fetch_metadata(&mut scan).await;
        if Instant::now() >= scan.deadline {
            tracing::warn!("Deadline exceeded while fetching metadata for {}", mint);
            return DiscoveryResult::empty(token_meta, DiscoveryStatus::DeadlineExceeded, scan.stats);
        }

        let holders = match self.fetch_holders(&mut scan).await {
            Ok(holders) => holders,
            Err(DiscoveryError::DeadlineExceeded) => {
                return DiscoveryResult::empty(token_meta, DiscoveryStatus::DeadlineExceeded, scan.stats);
            }
            Err(e) => {
                tracing::warn!("Holder enumeration failed for {}: {}", mint, e);
                return DiscoveryResult::empty(token_meta, DiscoveryStatus::Failed, scan.stats);
            }
        };

        if holders.is_empty() {
            tracing::warn!("Token {} not found or has no holders", mint);
            return DiscoveryResult::empty(token_meta, DiscoveryStatus::NoHolders, scan.stats);
        }

        scan.plan = ScanPlan::new(
            self.config.budget_for(tier),
            self.config.max_wallets,
            holders.len(),
            self.config.candidates_per_transaction,
        );
        tracing::info!(
            "Found {} holder accounts, scanning {} x {} signatures (target {} wallets)",
            holders.len(),
            scan.plan.accounts,
            scan.plan.signatures_per_account,
            scan.plan.wallet_target
        );

        let status = self.scan_holders(&mut scan, &holders).await;

        let mut observations = scan.observations;
        sort_observations(&mut observations);
        observations.truncate(scan.plan.wallet_target);

        tracing::info!(
            "Discovery of {} finished: {} wallets, {} RPC calls, status {:?}",
            mint,
            observations.len(),
            scan.stats.rpc_calls,
            status
        );

        DiscoveryResult {
            observations,
            token_meta,
            status,
            stats: scan.stats,
        }
    }

    /// External source first, then the mint account, then getTokenSupply
    async fn fetch_metadata(&self, scan: &mut Scan<'_>) -> TokenMeta {
        let mut meta = TokenMeta::default();

        if let Some(source) = &self.token_info {
            match tokio::time::timeout_at(scan.deadline, source.token_meta(scan.mint)).await {
                Ok(Ok(Some(external))) => meta.merge(external),
                Ok(Ok(None)) => tracing::debug!("Token API does not know {}", scan.mint),
                Ok(Err(e)) => tracing::warn!("Token API lookup failed for {}: {}", scan.mint, e),
                Err(_) => return meta,
            }
        }

        if self.pause(scan, Stage::Metadata).await.is_err() {
            return meta;
        }

        let chain = Arc::clone(&self.chain);
        let mint = scan.mint;
        match bounded(scan, chain.mint_info(mint)).await {
            Ok(Some(on_chain)) => {
                meta.merge(on_chain);
                return meta;
            }
            Ok(None) => tracing::debug!("No parsed mint account for {}", mint),
            Err(DiscoveryError::DeadlineExceeded) => return meta,
            Err(e) => tracing::warn!("Mint account lookup failed for {}: {}", mint, e),
        }

        match bounded(scan, chain.token_supply(mint)).await {
            Ok(Some(supply)) => meta.merge(supply),
            Ok(None) => {}
            Err(e) => tracing::warn!("Token supply lookup failed for {}: {}", mint, e),
        }

        meta
    }

    async fn fetch_holders(&self, scan: &mut Scan<'_>) -> Result<Vec<HolderAccount>, DiscoveryError> {
        self.pause(scan, Stage::HolderAccounts).await?;
        let chain = Arc::clone(&self.chain);
        let mint = scan.mint;
        bounded(scan, chain.token_largest_accounts(mint)).await
    }

    async fn scan_holders(&self, scan: &mut Scan<'_>, holders: &[HolderAccount]) -> DiscoveryStatus {
        for (account_index, holder) in holders.iter().take(scan.plan.accounts).enumerate() {
            if account_index > 0 && self.pause(scan, Stage::BetweenAccounts).await.is_err() {
                return DiscoveryStatus::DeadlineExceeded;
            }

            match self.scan_account(scan, account_index, holder).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::BudgetReached) => {
                    tracing::info!("Wallet target reached");
                    return DiscoveryStatus::BudgetReached;
                }
                Err(DiscoveryError::DeadlineExceeded) => {
                    tracing::warn!("Deadline exceeded, returning {} wallets", scan.observations.len());
                    return DiscoveryStatus::DeadlineExceeded;
                }
                Err(e) => {
                    tracing::warn!("Skipping holder account {}: {}", holder.address, e);
                }
            }
        }

        DiscoveryStatus::Complete
    }

    async fn scan_account(
        &self,
        scan: &mut Scan<'_>,
        account_index: usize,
        holder: &HolderAccount,
    ) -> Result<Flow, DiscoveryError> {
        self.pause(scan, Stage::Signatures).await?;

        let chain = Arc::clone(&self.chain);
        let limit = scan.plan.signature_page_limit;
        let page = bounded(scan, chain.signatures_for_address(&holder.address, limit)).await?;
        scan.stats.accounts_scanned += 1;

        if page.is_empty() {
            tracing::debug!("No signatures for holder account {}", holder.address);
            return Ok(Flow::Continue);
        }

        // The page is newest first: keep the oldest N, oldest first
        let start = page.len().saturating_sub(scan.plan.signatures_per_account);
        let oldest = page[start..]
            .iter()
            .rev()
            .map(|info| (info.signature.clone(), info.block_time))
            .collect();
        let records = SignatureRecord::scan_order(account_index, oldest);
        scan.stats.signatures_scanned += records.len() as u32;

        for record in &records {
            match self.scan_signature(scan, record).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::BudgetReached) => return Ok(Flow::BudgetReached),
                Err(DiscoveryError::DeadlineExceeded) => return Err(DiscoveryError::DeadlineExceeded),
                Err(e) => tracing::warn!("Skipping transaction {}: {}", record.signature, e),
            }
        }

        Ok(Flow::Continue)
    }

    async fn scan_signature(&self, scan: &mut Scan<'_>, record: &SignatureRecord) -> Result<Flow, DiscoveryError> {
        self.pause(scan, Stage::Transaction).await?;

        let chain = Arc::clone(&self.chain);
        let keys = bounded(scan, chain.transaction_account_keys(&record.signature)).await?;
        scan.stats.transactions_inspected += 1;

        let Some(keys) = keys else {
            tracing::debug!("Transaction {} not available", record.signature);
            return Ok(Flow::Continue);
        };

        for candidate in keys.into_iter().take(self.config.candidates_per_transaction) {
            if !is_user_wallet(&candidate, scan.mint) {
                scan.stats.candidates_rejected += 1;
                continue;
            }

            if !scan.seen.insert(candidate.clone()) {
                continue;
            }

            scan.stats.rpc_calls += 1;
            scan.stats.balance_lookups += 1;
            let balance = tokio::time::timeout_at(scan.deadline, balance_of(chain.as_ref(), &candidate))
                .await
                .map_err(|_| DiscoveryError::DeadlineExceeded)?;

            tracing::debug!(
                "Wallet found: {} ({:.4} SOL, block time {:?})",
                candidate,
                balance,
                record.block_time
            );
            scan.observations.push(WalletObservation::new(candidate, balance, record));

            if scan.observations.len() >= scan.plan.wallet_target {
                return Ok(Flow::BudgetReached);
            }
        }

        Ok(Flow::Continue)
    }

    /// Sleep for the stage pause, failing if the deadline falls inside it
    async fn pause(&self, scan: &Scan<'_>, stage: Stage) -> Result<(), DiscoveryError> {
        let wait = stage_pause(scan.tier, stage, &self.config.pacing);
        let now = Instant::now();
        if now >= scan.deadline {
            return Err(DiscoveryError::DeadlineExceeded);
        }

        match now.checked_add(wait) {
            Some(wake) if wake < scan.deadline => {
                if !wait.is_zero() {
                    tokio::time::sleep_until(wake).await;
                }
                Ok(())
            }
            _ => {
                tokio::time::sleep_until(scan.deadline).await;
                Err(DiscoveryError::DeadlineExceeded)
            }
        }
    }
}

/// Run one RPC call under the scan deadline, counting it
async fn bounded<T, F>(scan: &mut Scan<'_>, call: F) -> Result<T, DiscoveryError>
where
    F: Future<Output = Result<T, RpcError>>,
{
    scan.stats.rpc_calls += 1;
    match tokio::time::timeout_at(scan.deadline, call).await {
        Ok(result) => result.map_err(DiscoveryError::from),
        Err(_) => Err(DiscoveryError::DeadlineExceeded),
    }
}

fn deadline_after(limit: Duration) -> Instant {
    let now = Instant::now();
    // Effectively unbounded when the configured limit overflows the clock
    now.checked_add(limit)
        .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::chain::MockChainReader;
    use crate::ports::token_info::MockTokenInfoSource;
    use crate::ports::{SignatureInfo, TokenInfoError};

    const MINT: &str = "BxrYotq7fzH5tw4k4UQyekYje8n7rhNNgRCwa5Shpump";
    const HOLDER: &str = "HoLdEr1111AccountAaaaaaaaaaaaaaaaaaaaaaaaaa";
    const W1: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
    const W2: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn config() -> DiscoveryConfig {
        DiscoveryConfig {
            pacing: PacingConfig::none(),
            ..Default::default()
        }
    }

    fn base_mock() -> MockChainReader {
        let mut chain = MockChainReader::new();
        chain.expect_active_tier().return_const(EndpointTier::Public);
        chain.expect_mint_info().returning(|_| {
            Ok(Some(TokenMeta {
                decimals: Some(6),
                supply: Some(1_000_000),
                ..Default::default()
            }))
        });
        chain
    }

    #[tokio::test]
    async fn test_no_holders() {
        let mut chain = base_mock();
        chain.expect_token_largest_accounts().returning(|_| Ok(vec![]));
        chain.expect_signatures_for_address().never();

        let discovery = BuyerDiscovery::new(Arc::new(chain), None, config());
        let result = discovery.discover(MINT).await;

        assert!(result.is_empty());
        assert_eq!(result.status, DiscoveryStatus::NoHolders);
        assert_eq!(result.token_meta.decimals, Some(6));
    }

    #[tokio::test]
    async fn test_holder_failure_is_not_a_crash() {
        let mut chain = base_mock();
        chain.expect_token_largest_accounts().returning(|_| {
            Err(RpcError::NoEndpointAvailable {
                method: "getTokenLargestAccounts".to_string(),
            })
        });

        let discovery = BuyerDiscovery::new(Arc::new(chain), None, config());
        let result = discovery.discover(MINT).await;

        assert!(result.is_empty());
        assert_eq!(result.status, DiscoveryStatus::Failed);
        assert_eq!(result.token_meta.supply, Some(1_000_000));
    }

    #[tokio::test]
    async fn test_metadata_falls_back_to_token_supply() {
        let mut chain = MockChainReader::new();
        chain.expect_active_tier().return_const(EndpointTier::Public);
        chain.expect_mint_info().times(1).returning(|_| Ok(None));
        chain.expect_token_supply().times(1).returning(|_| {
            Ok(Some(TokenMeta {
                decimals: Some(9),
                supply: Some(42),
                ..Default::default()
            }))
        });
        chain.expect_token_largest_accounts().returning(|_| Ok(vec![]));

        let mut token_info = MockTokenInfoSource::new();
        token_info.expect_token_meta().returning(|_| {
            Ok(Some(TokenMeta {
                name: Some("Pump".to_string()),
                symbol: Some("PMP".to_string()),
                ..Default::default()
            }))
        });

        let discovery = BuyerDiscovery::new(Arc::new(chain), Some(Arc::new(token_info)), config());
        let meta = discovery.discover(MINT).await.token_meta;

        assert_eq!(meta.display_name(), "Pump");
        assert_eq!(meta.symbol.as_deref(), Some("PMP"));
        assert_eq!(meta.decimals, Some(9));
        assert_eq!(meta.supply, Some(42));
    }

    #[tokio::test]
    async fn test_token_api_failure_is_tolerated() {
        let mut chain = base_mock();
        chain.expect_token_largest_accounts().returning(|_| Ok(vec![]));

        let mut token_info = MockTokenInfoSource::new();
        token_info
            .expect_token_meta()
            .returning(|_| Err(TokenInfoError::Status(500)));

        let discovery = BuyerDiscovery::new(Arc::new(chain), Some(Arc::new(token_info)), config());
        let meta = discovery.discover(MINT).await.token_meta;

        assert!(meta.name.is_none());
        assert_eq!(meta.decimals, Some(6));
    }

    #[tokio::test]
    async fn test_filters_and_dedups_candidates() {
        let mut chain = base_mock();
        chain.expect_token_largest_accounts().returning(|_| {
            Ok(vec![HolderAccount {
                address: HOLDER.to_string(),
                ui_amount: Some(1.0),
            }])
        });
        chain.expect_signatures_for_address().returning(|_, _| {
            Ok(vec![
                SignatureInfo {
                    signature: "sig-b".to_string(),
                    block_time: Some(200),
                },
                SignatureInfo {
                    signature: "sig-a".to_string(),
                    block_time: Some(100),
                },
            ])
        });
        chain.expect_transaction_account_keys().returning(|sig| {
            let keys = match sig {
                "sig-a" => vec![W1, MINT, "11111111111111111111111111111111"],
                _ => vec![W1, W2, "ComputeBudget111111111111111111111111111111"],
            };
            Ok(Some(keys.into_iter().map(String::from).collect()))
        });
        chain.expect_balance_lamports().returning(|_| Ok(1_000_000_000));

        let discovery = BuyerDiscovery::new(Arc::new(chain), None, config());
        let result = discovery.discover(MINT).await;

        assert_eq!(result.wallets(), vec![W1, W2]);
        assert_eq!(result.status, DiscoveryStatus::Complete);
        assert_eq!(result.stats.candidates_rejected, 3);
        assert_eq!(result.stats.balance_lookups, 2);
        assert_eq!(result.stats.transactions_inspected, 2);
        approx::assert_relative_eq!(result.observations[0].balance_sol, 1.0);
    }

    #[tokio::test]
    async fn test_failed_transaction_is_skipped() {
        let mut chain = base_mock();
        chain.expect_token_largest_accounts().returning(|_| {
            Ok(vec![HolderAccount {
                address: HOLDER.to_string(),
                ui_amount: None,
            }])
        });
        chain.expect_signatures_for_address().returning(|_, _| {
            Ok(vec![
                SignatureInfo {
                    signature: "good".to_string(),
                    block_time: Some(20),
                },
                SignatureInfo {
                    signature: "bad".to_string(),
                    block_time: Some(10),
                },
            ])
        });
        chain.expect_transaction_account_keys().returning(|sig| {
            if sig == "bad" {
                Err(RpcError::NoEndpointAvailable {
                    method: "getTransaction".to_string(),
                })
            } else {
                Ok(Some(vec![W2.to_string()]))
            }
        });
        chain.expect_balance_lamports().returning(|_| {
            Err(RpcError::NoEndpointAvailable {
                method: "getBalance".to_string(),
            })
        });

        let discovery = BuyerDiscovery::new(Arc::new(chain), None, config());
        let result = discovery.discover(MINT).await;

        assert_eq!(result.wallets(), vec![W2]);
        // balance failure defaults to zero
        approx::assert_relative_eq!(result.observations[0].balance_sol, 0.0);
    }

    #[tokio::test]
    async fn test_zero_deadline_returns_immediately() {
        let mut chain = base_mock();
        chain.expect_token_largest_accounts().never();

        let discovery = BuyerDiscovery::new(
            Arc::new(chain),
            None,
            DiscoveryConfig {
                deadline: Duration::ZERO,
                ..config()
            },
        );
        let result = discovery.discover(MINT).await;

        assert_eq!(result.status, DiscoveryStatus::DeadlineExceeded);
        assert!(result.is_empty());
    }
}
