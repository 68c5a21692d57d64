//! Jupiter Token API client
//!
//! Best-effort descriptive metadata (name, symbol, decimals) for a mint.
//! Unknown mints are `Ok(None)`, not errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::types::JupiterToken;
use crate::domain::TokenMeta;
use crate::ports::{TokenInfoError, TokenInfoSource};

/// Configuration for the Jupiter token source
#[derive(Debug, Clone)]
pub struct JupiterTokenConfig {
    /// Base URL for the token API
    pub token_api_url: String,
    /// Optional API key for higher rate limits
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for JupiterTokenConfig {
    fn default() -> Self {
        Self {
            token_api_url: "https://lite-api.jup.ag/tokens/v1".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl JupiterTokenConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            token_api_url: "https://api.jup.ag/tokens/v1".to_string(),
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct JupiterTokenSource {
    config: JupiterTokenConfig,
    http: Client,
}

impl JupiterTokenSource {
    pub fn new() -> Result<Self, TokenInfoError> {
        Self::with_config(JupiterTokenConfig::default())
    }

    pub fn with_config(config: JupiterTokenConfig) -> Result<Self, TokenInfoError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TokenInfoError::Http(e.to_string()))?;

        Ok(Self { config, http })
    }

    /// Get token info by mint address
    pub async fn get_token(&self, mint: &str) -> Result<Option<JupiterToken>, TokenInfoError> {
        let url = format!("{}/token/{}", self.config.token_api_url.trim_end_matches('/'), mint);

        let mut req = self.http.get(&url);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| TokenInfoError::Http(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(TokenInfoError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TokenInfoError::Parse(e.to_string()))?;

        parse_token(body)
    }
}

/// The API answers `null` for mints it does not track
fn parse_token(body: Value) -> Result<Option<JupiterToken>, TokenInfoError> {
    if body.is_null() {
        return Ok(None);
    }

    serde_json::from_value(body)
        .map(Some)
        .map_err(|e| TokenInfoError::Parse(format!("Failed to parse token: {}", e)))
}

#[async_trait]
impl TokenInfoSource for JupiterTokenSource {
    async fn token_meta(&self, mint: &str) -> Result<Option<TokenMeta>, TokenInfoError> {
        Ok(self.get_token(mint).await?.map(TokenMeta::from))
    }
}
