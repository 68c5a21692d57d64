//! Hand-written test doubles shared by unit and integration tests.
//!
//! - `ScriptedTransport`: per-endpoint queues of HTTP replies, records every POST
//! - `InMemoryChain`: a synthetic ledger implementing `ChainReader`
//! - `StaticTokenInfo`: fixed metadata per mint

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::chain::{ChainReader, HolderAccount, SignatureInfo};
use super::token_info::{TokenInfoError, TokenInfoSource};
use super::transport::{HttpReply, RpcTransport, TransportError};
use super::RpcError;
use crate::domain::{Endpoint, EndpointTier, TokenMeta};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum ScriptedReply {
    Reply(HttpReply),
    Timeout,
    Fail(String),
}

/// A recorded POST: endpoint URL and JSON-RPC method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub url: String,
    pub method: String,
}

/// Transport that replays scripted replies per endpoint URL.
///
/// An endpoint whose queue is empty fails with a transport error.
#[derive(Default, Clone)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<HashMap<String, VecDeque<ScriptedReply>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, url: &str, reply: ScriptedReply) -> Self {
        lock(&self.replies)
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// HTTP 200 carrying `result`
    pub fn with_result(self, url: &str, result: Value) -> Self {
        let body = json!({"jsonrpc": "2.0", "id": 1, "result": result});
        self.push(url, ScriptedReply::Reply(HttpReply::new(200, body)))
    }

    /// HTTP 200 carrying a JSON-RPC `error`
    pub fn with_rpc_error(self, url: &str, code: i64, message: &str) -> Self {
        let body = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": code, "message": message}});
        self.push(url, ScriptedReply::Reply(HttpReply::new(200, body)))
    }

    /// Bare HTTP status without a body
    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.push(url, ScriptedReply::Reply(HttpReply::status_only(status)))
    }

    pub fn with_timeout(self, url: &str) -> Self {
        self.push(url, ScriptedReply::Timeout)
    }

    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.push(url, ScriptedReply::Fail(message.to_string()))
    }

    /// Every POST so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        lock(&self.calls).iter().filter(|c| c.url == url).count()
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn post(
        &self,
        endpoint: &Endpoint,
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        let method = body
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        lock(&self.calls).push(RecordedCall {
            url: endpoint.url().to_string(),
            method,
        });

        let next = lock(&self.replies)
            .get_mut(endpoint.url())
            .and_then(VecDeque::pop_front);

        match next {
            Some(ScriptedReply::Reply(reply)) => Ok(reply),
            Some(ScriptedReply::Timeout) => Err(TransportError::Timeout(timeout)),
            Some(ScriptedReply::Fail(message)) => Err(TransportError::Http(message)),
            None => Err(TransportError::Http(format!(
                "no scripted reply for {}",
                endpoint.url()
            ))),
        }
    }
}

/// Synthetic ledger for pipeline tests
#[derive(Default)]
pub struct InMemoryChain {
    tier: Option<EndpointTier>,
    /// `(mint, holder)`; a `None` mint holds every token
    holders: Vec<(Option<String>, HolderAccount)>,
    fail_holders: bool,
    mint_meta: Option<TokenMeta>,
    supply_meta: Option<TokenMeta>,
    signatures: HashMap<String, Vec<SignatureInfo>>,
    failing_accounts: HashSet<String>,
    transactions: HashMap<String, Vec<String>>,
    failing_transactions: HashSet<String>,
    balances: HashMap<String, u64>,
    calls: Mutex<Vec<String>>,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tier(mut self, tier: EndpointTier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Holder account returned for every mint
    pub fn with_holder(mut self, address: &str) -> Self {
        self.holders.push((None, Self::holder(address)));
        self
    }

    /// Holder account returned only for `mint`
    pub fn with_holder_of(mut self, mint: &str, address: &str) -> Self {
        self.holders.push((Some(mint.to_string()), Self::holder(address)));
        self
    }

    fn holder(address: &str) -> HolderAccount {
        HolderAccount {
            address: address.to_string(),
            ui_amount: None,
        }
    }

    /// Make holder enumeration fail as if every endpoint were down
    pub fn with_failing_holders(mut self) -> Self {
        self.fail_holders = true;
        self
    }

    pub fn with_mint_meta(mut self, meta: TokenMeta) -> Self {
        self.mint_meta = Some(meta);
        self
    }

    pub fn with_supply_meta(mut self, meta: TokenMeta) -> Self {
        self.supply_meta = Some(meta);
        self
    }

    /// Signature history of an account, given newest first as the node returns it
    pub fn with_signatures(mut self, account: &str, signatures: &[(&str, Option<i64>)]) -> Self {
        self.signatures.insert(
            account.to_string(),
            signatures
                .iter()
                .map(|(signature, block_time)| SignatureInfo {
                    signature: signature.to_string(),
                    block_time: *block_time,
                })
                .collect(),
        );
        self
    }

    /// Make signature lookups for `account` fail on every endpoint
    pub fn with_failing_signatures(mut self, account: &str) -> Self {
        self.failing_accounts.insert(account.to_string());
        self
    }

    pub fn with_transaction(mut self, signature: &str, account_keys: &[&str]) -> Self {
        self.transactions.insert(
            signature.to_string(),
            account_keys.iter().map(|k| k.to_string()).collect(),
        );
        self
    }

    pub fn with_failing_transaction(mut self, signature: &str) -> Self {
        self.failing_transactions.insert(signature.to_string());
        self
    }

    pub fn with_balance(mut self, address: &str, lamports: u64) -> Self {
        self.balances.insert(address.to_string(), lamports);
        self
    }

    /// Methods called so far, in order
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        lock(&self.calls).iter().filter(|m| *m == method).count()
    }

    fn record(&self, method: &str) {
        lock(&self.calls).push(method.to_string());
    }

    fn unavailable(method: &str) -> RpcError {
        RpcError::NoEndpointAvailable {
            method: method.to_string(),
        }
    }
}

#[async_trait]
impl ChainReader for InMemoryChain {
    fn active_tier(&self) -> EndpointTier {
        self.tier.unwrap_or(EndpointTier::Public)
    }

    async fn token_largest_accounts(&self, mint: &str) -> Result<Vec<HolderAccount>, RpcError> {
        self.record("getTokenLargestAccounts");
        if self.fail_holders {
            return Err(Self::unavailable("getTokenLargestAccounts"));
        }
        Ok(self
            .holders
            .iter()
            .filter(|(owner, _)| owner.as_deref().map_or(true, |m| m == mint))
            .map(|(_, holder)| holder.clone())
            .collect())
    }

    async fn mint_info(&self, _mint: &str) -> Result<Option<TokenMeta>, RpcError> {
        self.record("getAccountInfo");
        Ok(self.mint_meta.clone())
    }

    async fn token_supply(&self, _mint: &str) -> Result<Option<TokenMeta>, RpcError> {
        self.record("getTokenSupply");
        Ok(self.supply_meta.clone())
    }

    async fn signatures_for_address(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        self.record("getSignaturesForAddress");
        if self.failing_accounts.contains(address) {
            return Err(Self::unavailable("getSignaturesForAddress"));
        }
        Ok(self
            .signatures
            .get(address)
            .map(|sigs| sigs.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn transaction_account_keys(&self, signature: &str) -> Result<Option<Vec<String>>, RpcError> {
        self.record("getTransaction");
        if self.failing_transactions.contains(signature) {
            return Err(Self::unavailable("getTransaction"));
        }
        Ok(self.transactions.get(signature).cloned())
    }

    async fn balance_lamports(&self, address: &str) -> Result<u64, RpcError> {
        self.record("getBalance");
        self.balances
            .get(address)
            .copied()
            .ok_or_else(|| Self::unavailable("getBalance"))
    }
}

/// Token info source with fixed answers
#[derive(Debug, Default, Clone)]
pub struct StaticTokenInfo {
    tokens: HashMap<String, TokenMeta>,
}

impl StaticTokenInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, mint: &str, meta: TokenMeta) -> Self {
        self.tokens.insert(mint.to_string(), meta);
        self
    }
}

#[async_trait]
impl TokenInfoSource for StaticTokenInfo {
    async fn token_meta(&self, mint: &str) -> Result<Option<TokenMeta>, TokenInfoError> {
        Ok(self.tokens.get(mint).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_transport_replays_in_order() {
        let transport = ScriptedTransport::new()
            .with_status("http://a", 429)
            .with_result("http://a", json!(5));
        let endpoint = Endpoint::new("http://a");
        let body = json!({"method": "getBalance"});

        let first = transport.post(&endpoint, &body, Duration::from_secs(1)).await.unwrap();
        assert_eq!(first.status, 429);
        let second = transport.post(&endpoint, &body, Duration::from_secs(1)).await.unwrap();
        assert_eq!(second.body.unwrap()["result"], json!(5));
        assert!(transport.post(&endpoint, &body, Duration::from_secs(1)).await.is_err());

        assert_eq!(transport.calls_to("http://a"), 3);
        assert_eq!(transport.calls()[0].method, "getBalance");
    }

    #[tokio::test]
    async fn test_in_memory_chain_pages_newest_first() {
        let chain = InMemoryChain::new().with_signatures(
            "acct",
            &[("s3", Some(3)), ("s2", Some(2)), ("s1", Some(1))],
        );

        let page = chain.signatures_for_address("acct", 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].signature, "s3");
        assert_eq!(chain.call_count("getSignaturesForAddress"), 1);
    }

    #[tokio::test]
    async fn test_in_memory_chain_holders_per_mint() {
        let chain = InMemoryChain::new()
            .with_holder("shared")
            .with_holder_of("mintA", "onlyA");

        let a = chain.token_largest_accounts("mintA").await.unwrap();
        let b = chain.token_largest_accounts("mintB").await.unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].address, "shared");
    }
}
