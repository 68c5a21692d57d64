//! RPC Executor
//!
//! Issues one logical JSON-RPC call against the endpoint pool. Two retry levels:
//! - inner: up to `retry_attempts` tries on the same endpoint, paced by `wait_before`
//! - outer: one pass per pool entry, rotating the cursor after each failed endpoint
//!
//! Reply classification:
//! - 200 with `result` (null included): success
//! - 200 with `error` -32601/-32602: rejected, no further attempts anywhere
//! - 200 with any other `error`: retry on the same endpoint
//! - 429: retry, and blacklist the endpoint on the last attempt
//! - other status, timeout, transport failure: give up on this endpoint

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use solana_client::rpc_request::RpcRequest;

use crate::domain::{wait_before, EndpointPool, PacingConfig};
use crate::ports::{HttpReply, RpcError, RpcTransport, TransportError};

/// JSON-RPC "method not found"
pub const METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC "invalid params"
pub const INVALID_PARAMS: i64 = -32602;

const HTTP_OK: u16 = 200;
const HTTP_TOO_MANY_REQUESTS: u16 = 429;

/// Retry and timeout settings for the executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Attempts per endpoint before rotating
    pub retry_attempts: u32,
    /// Default per-call timeout
    pub timeout: Duration,
    pub pacing: PacingConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            timeout: Duration::from_secs(30),
            pacing: PacingConfig::default(),
        }
    }
}

enum ReplyOutcome {
    Success(Value),
    Rejected { code: i64, message: String },
    Retry,
    RateLimited,
    EndpointFault,
}

/// Resilient executor shared by every chain read
#[derive(Clone)]
pub struct RpcExecutor {
    pool: Arc<EndpointPool>,
    transport: Arc<dyn RpcTransport>,
    config: ExecutorConfig,
}

impl RpcExecutor {
    pub fn new(pool: Arc<EndpointPool>, transport: Arc<dyn RpcTransport>, config: ExecutorConfig) -> Self {
        Self {
            pool,
            transport,
            config,
        }
    }

    pub fn pool(&self) -> &Arc<EndpointPool> {
        &self.pool
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute with the configured timeout
    pub async fn execute(&self, request: RpcRequest, params: Value) -> Result<Value, RpcError> {
        self.execute_with_timeout(request, params, self.config.timeout).await
    }

    /// Execute one logical call, returning the JSON-RPC `result`
    pub async fn execute_with_timeout(
        &self,
        request: RpcRequest,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        let method = request.to_string();
        let attempts = self.config.retry_attempts.max(1);

        for _ in 0..self.pool.len() {
            let endpoint = self.pool.next_endpoint();

            for attempt in 0..attempts {
                let wait = wait_before(endpoint.tier(), attempt, &self.config.pacing);
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }

                let id = rand::thread_rng().gen_range(1..=10_000u64);
                let body = request.build_request_json(id, params.clone());
                tracing::debug!(
                    "{} -> {} (attempt {}/{})",
                    method,
                    endpoint.url(),
                    attempt + 1,
                    attempts
                );

                match self.transport.post(&endpoint, &body, timeout).await {
                    Ok(reply) => match classify(reply) {
                        ReplyOutcome::Success(result) => return Ok(result),
                        ReplyOutcome::Rejected { code, message } => {
                            tracing::warn!("{} rejected by {}: {} ({})", method, endpoint.url(), message, code);
                            return Err(RpcError::Rejected { code, message });
                        }
                        ReplyOutcome::Retry => {
                            tracing::warn!("{} returned a retryable error on {}", method, endpoint.url());
                            continue;
                        }
                        ReplyOutcome::RateLimited => {
                            tracing::warn!(
                                "Rate limited (429) on {} (attempt {}/{})",
                                endpoint.url(),
                                attempt + 1,
                                attempts
                            );
                            if attempt + 1 >= attempts {
                                self.pool.blacklist(&endpoint);
                            }
                            continue;
                        }
                        ReplyOutcome::EndpointFault => break,
                    },
                    Err(TransportError::Timeout(after)) => {
                        tracing::warn!("{} timed out after {:?} on {}", method, after, endpoint.url());
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("{} failed on {}: {}", method, endpoint.url(), e);
                        break;
                    }
                }
            }

            tracing::info!("Rotating away from RPC endpoint {}", endpoint.url());
            self.pool.advance();
        }

        tracing::warn!("All RPC endpoints failed for {}", method);
        Err(RpcError::NoEndpointAvailable { method })
    }
}

fn classify(reply: HttpReply) -> ReplyOutcome {
    match reply.status {
        HTTP_OK => {}
        HTTP_TOO_MANY_REQUESTS => return ReplyOutcome::RateLimited,
        status => {
            tracing::warn!("HTTP error {}", status);
            return ReplyOutcome::EndpointFault;
        }
    }

    let Some(Value::Object(mut body)) = reply.body else {
        return ReplyOutcome::Retry;
    };

    if let Some(result) = body.remove("result") {
        return ReplyOutcome::Success(result);
    }

    let Some(error) = body.get("error") else {
        return ReplyOutcome::Retry;
    };

    let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
    if code == METHOD_NOT_FOUND || code == INVALID_PARAMS {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return ReplyOutcome::Rejected { code, message };
    }

    ReplyOutcome::Retry
}
