use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::Endpoint;

/// Raw HTTP outcome of one JSON-RPC POST
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    /// Parsed JSON body, `None` when the body was not JSON
    pub body: Option<Value>,
}

impl HttpReply {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn status_only(status: u16) -> Self {
        Self { status, body: None }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP transport failed: {0}")]
    Http(String),
}

/// Sends one JSON-RPC body to one endpoint. No retries, no rotation.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn post(
        &self,
        endpoint: &Endpoint,
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError>;
}
