//! Endpoint Probe
//!
//! Health check for the configured endpoint list. Sends one `getVersion` to
//! each endpoint, bypassing the pool's retry and blacklist logic, and reports
//! status, latency and node version.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use solana_client::rpc_request::RpcRequest;

use super::types::VersionInfo;
use crate::domain::{Endpoint, EndpointTier};
use crate::ports::{RpcTransport, TransportError};

/// Endpoints probed concurrently
const MAX_IN_FLIGHT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProbeStatus {
    Ok,
    HttpError(u16),
    Timeout,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub tier: EndpointTier,
    pub status: ProbeStatus,
    pub latency: Duration,
    pub version: Option<String>,
}

impl ProbeReport {
    pub fn is_ok(&self) -> bool {
        self.status == ProbeStatus::Ok
    }
}

pub struct EndpointProbe {
    transport: Arc<dyn RpcTransport>,
    timeout: Duration,
}

impl EndpointProbe {
    pub fn new(transport: Arc<dyn RpcTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Probe every endpoint. Working endpoints come first, fastest first;
    /// failed ones follow in configuration order.
    pub async fn probe_all(&self, endpoints: &[Endpoint]) -> Vec<ProbeReport> {
        let mut reports: Vec<(usize, ProbeReport)> = stream::iter(endpoints.iter().enumerate())
            .map(|(index, endpoint)| async move { (index, self.probe(endpoint).await) })
            .buffer_unordered(MAX_IN_FLIGHT)
            .collect()
            .await;

        reports.sort_by(|(ia, a), (ib, b)| {
            b.is_ok()
                .cmp(&a.is_ok())
                .then_with(|| {
                    if a.is_ok() && b.is_ok() {
                        a.latency.cmp(&b.latency)
                    } else {
                        ia.cmp(ib)
                    }
                })
        });

        reports.into_iter().map(|(_, report)| report).collect()
    }

    pub async fn probe(&self, endpoint: &Endpoint) -> ProbeReport {
        let body = RpcRequest::GetVersion.build_request_json(1, json!([]));
        let start = Instant::now();
        let outcome = self.transport.post(endpoint, &body, self.timeout).await;
        let latency = start.elapsed();

        let (status, version) = match outcome {
            Ok(reply) if reply.status == 200 => match parse_version(reply.body) {
                Some(version) => (ProbeStatus::Ok, Some(version)),
                None => (ProbeStatus::Failed("Invalid response format".to_string()), None),
            },
            Ok(reply) => (ProbeStatus::HttpError(reply.status), None),
            Err(TransportError::Timeout(_)) => (ProbeStatus::Timeout, None),
            Err(e) => (ProbeStatus::Failed(e.to_string()), None),
        };

        tracing::debug!("Probe {}: {:?} in {:?}", endpoint.url(), status, latency);

        ProbeReport {
            url: endpoint.url().to_string(),
            tier: endpoint.tier(),
            status,
            latency,
            version,
        }
    }
}

fn parse_version(body: Option<Value>) -> Option<String> {
    let result = body?.get("result")?.clone();
    serde_json::from_value::<VersionInfo>(result)
        .ok()
        .map(|v| v.solana_core)
}
