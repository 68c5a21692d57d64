//! Discovery Observations and Ordering
//!
//! Value types produced by one discovery run and the total order over them.
//! The sort key is `(timestamp, account_index, sig_index, address)` where a
//! missing block time is a structural `Unknown` that sorts after every known
//! time. Wall-clock time is kept for display only and never compared.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A transaction signature placed in scan order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRecord {
    pub signature: String,
    pub block_time: Option<i64>,
    pub account_index: usize,
    pub sig_index: usize,
}

impl SignatureRecord {
    /// Order one account's signatures for scanning.
    ///
    /// Signatures with a nonzero block time come first, stable-sorted
    /// ascending. The rest follow in their original order. `sig_index` is the
    /// position in the resulting sequence.
    pub fn scan_order(account_index: usize, raw: Vec<(String, Option<i64>)>) -> Vec<SignatureRecord> {
        let (mut timed, untimed): (Vec<_>, Vec<_>) = raw
            .into_iter()
            .partition(|(_, time)| BlockTime::from_raw(*time).is_known());

        timed.sort_by_key(|(_, time)| time.unwrap_or_default());

        timed
            .into_iter()
            .chain(untimed)
            .enumerate()
            .map(|(sig_index, (signature, block_time))| SignatureRecord {
                signature,
                block_time,
                account_index,
                sig_index,
            })
            .collect()
    }
}

/// Ordering timestamp. `Known` always sorts before `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockTime {
    Known(i64),
    Unknown,
}

impl BlockTime {
    /// Absent and zero block times are both unknown
    pub fn from_raw(block_time: Option<i64>) -> Self {
        match block_time {
            Some(t) if t != 0 => BlockTime::Known(t),
            _ => BlockTime::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, BlockTime::Known(_))
    }
}

/// Total ordering key of a wallet observation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey {
    pub timestamp: BlockTime,
    pub account_index: usize,
    pub sig_index: usize,
    pub address: String,
}

/// A newly discovered wallet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletObservation {
    pub address: String,
    pub balance_sol: f64,
    pub block_time: Option<i64>,
    pub account_index: usize,
    pub sig_index: usize,
    pub observed_at: DateTime<Utc>,
}

impl WalletObservation {
    pub fn new(address: impl Into<String>, balance_sol: f64, record: &SignatureRecord) -> Self {
        Self {
            address: address.into(),
            balance_sol,
            block_time: record.block_time,
            account_index: record.account_index,
            sig_index: record.sig_index,
            observed_at: Utc::now(),
        }
    }

    pub fn sort_key(&self) -> SortKey {
        SortKey {
            timestamp: BlockTime::from_raw(self.block_time),
            account_index: self.account_index,
            sig_index: self.sig_index,
            address: self.address.clone(),
        }
    }

    /// Display timestamp: the block time, else the moment the wallet was observed
    pub fn timestamp(&self) -> i64 {
        match BlockTime::from_raw(self.block_time) {
            BlockTime::Known(t) => t,
            BlockTime::Unknown => self.observed_at.timestamp(),
        }
    }

    pub fn cmp_key(&self, other: &Self) -> Ordering {
        BlockTime::from_raw(self.block_time)
            .cmp(&BlockTime::from_raw(other.block_time))
            .then(self.account_index.cmp(&other.account_index))
            .then(self.sig_index.cmp(&other.sig_index))
            .then_with(|| self.address.cmp(&other.address))
    }
}

/// Sort observations into the only order discovery ever returns
pub fn sort_observations(observations: &mut [WalletObservation]) {
    observations.sort_by(WalletObservation::cmp_key);
}

/// Descriptive token data, merged from several best-effort sources
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenMeta {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    /// Raw supply in base units
    pub supply: Option<u64>,
}

impl TokenMeta {
    /// Overlay `other` on top of `self`. Fields `other` lacks are kept.
    pub fn merge(&mut self, other: TokenMeta) {
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.symbol.is_some() {
            self.symbol = other.symbol;
        }
        if other.decimals.is_some() {
            self.decimals = other.decimals;
        }
        if other.supply.is_some() {
            self.supply = other.supply;
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &TokenMeta::default()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown Token")
    }

    pub fn display_symbol(&self) -> &str {
        self.symbol.as_deref().unwrap_or("UNKNOWN")
    }

    /// Supply scaled by decimals
    pub fn ui_supply(&self) -> Option<f64> {
        let supply = self.supply?;
        let decimals = self.decimals.unwrap_or(0) as i32;
        Some(supply as f64 / 10f64.powi(decimals))
    }
}

/// How a discovery run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiscoveryStatus {
    /// Every planned account and signature was scanned
    Complete,
    /// The wallet target was reached early
    BudgetReached,
    /// The per-invocation deadline cut the scan short
    DeadlineExceeded,
    /// The mint has no holder accounts (or does not exist)
    NoHolders,
    /// Holder enumeration or an unexpected fault stopped the run
    Failed,
}

/// Request accounting for one discovery run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryStats {
    pub rpc_calls: u32,
    pub accounts_scanned: u32,
    pub signatures_scanned: u32,
    pub transactions_inspected: u32,
    pub candidates_rejected: u32,
    pub balance_lookups: u32,
}

/// Outcome of one discovery run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryResult {
    pub observations: Vec<WalletObservation>,
    pub token_meta: TokenMeta,
    pub status: DiscoveryStatus,
    pub stats: DiscoveryStats,
}

impl DiscoveryResult {
    /// Empty result carrying whatever metadata was gathered
    pub fn empty(token_meta: TokenMeta, status: DiscoveryStatus, stats: DiscoveryStats) -> Self {
        Self {
            observations: Vec::new(),
            token_meta,
            status,
            stats,
        }
    }

    /// Wallet addresses in result order
    pub fn wallets(&self) -> Vec<String> {
        self.observations.iter().map(|o| o.address.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// `(wallets, token_meta, observations)`
    pub fn into_parts(self) -> (Vec<String>, TokenMeta, Vec<WalletObservation>) {
        let wallets = self.wallets();
        (wallets, self.token_meta, self.observations)
    }

    /// Reduced `(wallets, token_meta)` form for callers that ignore balances
    pub fn into_wallets(self) -> (Vec<String>, TokenMeta) {
        let (wallets, meta, _) = self.into_parts();
        (wallets, meta)
    }
}
