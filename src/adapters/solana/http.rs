//! reqwest-backed JSON-RPC transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::domain::Endpoint;
use crate::ports::{HttpReply, RpcTransport, TransportError};

/// Plain HTTP POST transport. Adds the endpoint's auth headers and a per-call timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let http = Client::builder()
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post(
        &self,
        endpoint: &Endpoint,
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        let mut req = self.http.post(endpoint.url()).timeout(timeout).json(body);

        for (name, value) in endpoint.headers() {
            req = req.header(name.as_str(), value.as_str());
        }

        let response = req.send().await.map_err(|e| classify(e, timeout))?;
        let status = response.status().as_u16();

        // Non-JSON bodies (HTML error pages from proxies) are common on failures
        let body = match response.json::<Value>().await {
            Ok(body) => Some(body),
            Err(e) if e.is_timeout() => return Err(TransportError::Timeout(timeout)),
            Err(_) => None,
        };

        Ok(HttpReply { status, body })
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Http(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        assert!(HttpTransport::new().is_ok());
    }

    #[test]
    fn test_with_client() {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let _transport = HttpTransport::with_client(client);
    }
}
