//! RPC Endpoint Pool
//!
//! Owns the ordered endpoint list, a round-robin rotation cursor and a
//! temporary blacklist. Rotation and blacklisting are independent:
//! - `advance()` moves the cursor after an endpoint fails out of a call
//! - `blacklist()` suppresses an endpoint for `BLACKLIST_TTL`
//!
//! Expired blacklist entries are pruned lazily on every selection. The pool is
//! shared across concurrent discoveries, so all state sits behind one mutex
//! that is never held across an await point.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

/// How long a rate-limited endpoint stays out of rotation
pub const BLACKLIST_TTL: Duration = Duration::from_secs(300);

/// Pacing tier of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EndpointTier {
    /// Public or shared endpoint, assumed to be rate limited
    Public,
    /// Authenticated endpoint, assumed not to be rate limited
    Premium,
}

impl EndpointTier {
    pub fn is_premium(&self) -> bool {
        matches!(self, EndpointTier::Premium)
    }
}

/// A single JSON-RPC endpoint. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    headers: BTreeMap<String, String>,
    tier: EndpointTier,
}

impl Endpoint {
    /// Public endpoint without auth headers
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_headers(url, BTreeMap::new())
    }

    /// Endpoint with custom auth headers. Any header makes it premium.
    pub fn with_headers(url: impl Into<String>, headers: BTreeMap<String, String>) -> Self {
        let tier = if headers.is_empty() {
            EndpointTier::Public
        } else {
            EndpointTier::Premium
        };

        Self {
            url: url.into(),
            headers,
            tier,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn tier(&self) -> EndpointTier {
        self.tier
    }

    pub fn is_premium(&self) -> bool {
        self.tier.is_premium()
    }
}

#[derive(Debug, Error)]
pub enum EndpointPoolError {
    #[error("Endpoint pool requires at least one endpoint")]
    Empty,
}

#[derive(Debug, Default)]
struct PoolState {
    cursor: usize,
    blacklist: HashMap<String, Instant>,
}

/// Process-wide endpoint rotation and blacklist
#[derive(Debug)]
pub struct EndpointPool {
    endpoints: Vec<Endpoint>,
    state: Mutex<PoolState>,
}

impl EndpointPool {
    /// Create a pool over a fixed, non-empty endpoint list
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, EndpointPoolError> {
        if endpoints.is_empty() {
            return Err(EndpointPoolError::Empty);
        }

        Ok(Self {
            endpoints,
            state: Mutex::new(PoolState::default()),
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// True iff the endpoint carries custom auth headers
    pub fn is_premium(&self, endpoint: &Endpoint) -> bool {
        endpoint.is_premium()
    }

    /// Next usable endpoint, skipping blacklisted ones
    pub fn next_endpoint(&self) -> Endpoint {
        self.next_endpoint_at(Instant::now())
    }

    /// Selection against an explicit clock reading.
    ///
    /// If every endpoint is blacklisted the first one is returned anyway.
    pub fn next_endpoint_at(&self, now: Instant) -> Endpoint {
        let mut state = self.lock();
        Self::prune_expired(&mut state, now);

        let len = self.endpoints.len();
        for _ in 0..len {
            let candidate = &self.endpoints[state.cursor % len];
            if !state.blacklist.contains_key(candidate.url()) {
                return candidate.clone();
            }
            state.cursor = state.cursor.wrapping_add(1);
        }

        tracing::warn!("All {} RPC endpoints are blacklisted, using the first one anyway", len);
        self.endpoints[0].clone()
    }

    /// Suppress an endpoint for `BLACKLIST_TTL`
    pub fn blacklist(&self, endpoint: &Endpoint) {
        self.blacklist_at(endpoint, Instant::now());
    }

    pub fn blacklist_at(&self, endpoint: &Endpoint, now: Instant) {
        self.lock().blacklist.insert(endpoint.url().to_string(), now);
        tracing::warn!(
            "RPC endpoint blacklisted for {}s: {}",
            BLACKLIST_TTL.as_secs(),
            endpoint.url()
        );
    }

    /// Move the rotation cursor forward by one
    pub fn advance(&self) {
        let mut state = self.lock();
        state.cursor = state.cursor.wrapping_add(1);
    }

    /// Whether the endpoint is currently blacklisted (expiry is not applied)
    pub fn is_blacklisted(&self, endpoint: &Endpoint) -> bool {
        self.lock().blacklist.contains_key(endpoint.url())
    }

    /// Tier of the endpoint the next call would use
    pub fn active_tier(&self) -> EndpointTier {
        self.next_endpoint().tier()
    }

    fn prune_expired(state: &mut PoolState, now: Instant) {
        state.blacklist.retain(|url, since| {
            let expired = now.saturating_duration_since(*since) >= BLACKLIST_TTL;
            if expired {
                tracing::info!("RPC endpoint removed from blacklist: {}", url);
            }
            !expired
        });
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
