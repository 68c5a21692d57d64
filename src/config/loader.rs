//! Configuration Loader
//!
//! Loads and validates configuration from TOML files, then applies
//! environment variable overrides (`.env` is loaded by the binary first).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::solana::ExecutorConfig;
use crate::adapters::token_metadata::JupiterTokenConfig;
use crate::application::DiscoveryConfig;
use crate::domain::{Endpoint, PacingConfig, TierBudget};

/// Public mainnet endpoint used when nothing else is configured
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub metadata: MetadataSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// One configured endpoint. Any header makes it premium.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EndpointEntry {
    pub url: String,
    /// Auth headers. Values may reference environment variables (`$HELIUS_KEY`).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// RPC configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct RpcSection {
    /// Ordered endpoint list
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointEntry>,
    /// Attempts per endpoint before rotating
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Base of the exponential retry backoff
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Delay before the first attempt on public endpoints
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Pause between holder accounts on public endpoints
    #[serde(default = "default_account_gap_ms")]
    pub account_gap_ms: u64,
    /// Per-call timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout used by the endpoint probe
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_delay_ms: default_request_delay_ms(),
            account_gap_ms: default_account_gap_ms(),
            timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

/// Discovery configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySection {
    /// Target number of wallets per discovery
    #[serde(default = "default_max_wallets")]
    pub max_wallets: usize,
    /// Per-invocation deadline
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default = "default_candidates_per_transaction")]
    pub candidates_per_transaction: usize,
    /// Overrides for public endpoint sampling limits
    #[serde(default)]
    pub public: Option<TierBudget>,
    /// Overrides for premium endpoint sampling limits
    #[serde(default)]
    pub premium: Option<TierBudget>,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            max_wallets: default_max_wallets(),
            deadline_secs: default_deadline_secs(),
            candidates_per_transaction: default_candidates_per_transaction(),
            public: None,
            premium: None,
        }
    }
}

/// Token metadata source section
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub token_api_url: Option<String>,
    /// Optional API key (falls back to JUPITER_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_metadata_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MetadataSection {
    fn default() -> Self {
        Self {
            enabled: true,
            token_api_url: None,
            api_key: None,
            timeout_secs: default_metadata_timeout_secs(),
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_endpoints() -> Vec<EndpointEntry> {
    vec![EndpointEntry {
        url: DEFAULT_RPC_URL.to_string(),
        headers: BTreeMap::new(),
    }]
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    100
}
fn default_request_delay_ms() -> u64 {
    250
}
fn default_account_gap_ms() -> u64 {
    3000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_probe_timeout_secs() -> u64 {
    5
}
fn default_max_wallets() -> usize {
    50
}
fn default_deadline_secs() -> u64 {
    300
}
fn default_candidates_per_transaction() -> usize {
    3
}
fn default_metadata_timeout_secs() -> u64 {
    10
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_true() -> bool {
    true
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file, apply environment overrides and validate
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

/// Defaults plus environment overrides, for running without a config file
pub fn config_from_env() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!("{} must be a number, got '{}'", name, value))
    })
}

impl Config {
    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(urls) = lookup("SOLANA_RPC_URLS") {
            let endpoints: Vec<EndpointEntry> = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(|url| EndpointEntry {
                    url: url.to_string(),
                    headers: BTreeMap::new(),
                })
                .collect();
            if !endpoints.is_empty() {
                self.rpc.endpoints = endpoints;
            }
        }
        if let Some(v) = lookup("RPC_RETRY_ATTEMPTS") {
            self.rpc.retry_attempts = parse_env("RPC_RETRY_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("RPC_RETRY_DELAY_MS") {
            self.rpc.retry_delay_ms = parse_env("RPC_RETRY_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("RPC_REQUEST_DELAY_MS") {
            self.rpc.request_delay_ms = parse_env("RPC_REQUEST_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("MAX_WALLETS_DISPLAY") {
            self.discovery.max_wallets = parse_env("MAX_WALLETS_DISPLAY", &v)?;
        }
        if self.metadata.api_key.as_deref().map_or(true, str::is_empty) {
            if let Some(key) = lookup("JUPITER_API_KEY").filter(|k| !k.is_empty()) {
                self.metadata.api_key = Some(key);
            }
        }
        Ok(())
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.endpoints.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one RPC endpoint is required".to_string(),
            ));
        }

        for endpoint in &self.rpc.endpoints {
            if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "endpoint url must be http(s), got '{}'",
                    endpoint.url
                )));
            }
        }

        if self.rpc.retry_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry_attempts must be > 0".to_string(),
            ));
        }

        if self.discovery.max_wallets == 0 {
            return Err(ConfigError::ValidationError(
                "max_wallets must be > 0".to_string(),
            ));
        }

        if self.discovery.candidates_per_transaction == 0 {
            return Err(ConfigError::ValidationError(
                "candidates_per_transaction must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Endpoints with header values expanded from the environment.
    /// Premium status is fixed here, once.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.rpc
            .endpoints
            .iter()
            .map(|entry| {
                let headers = entry
                    .headers
                    .iter()
                    .map(|(name, value)| (name.clone(), expand_header(value)))
                    .collect();
                Endpoint::with_headers(entry.url.clone(), headers)
            })
            .collect()
    }

    pub fn pacing(&self) -> PacingConfig {
        PacingConfig {
            request_delay: Duration::from_millis(self.rpc.request_delay_ms),
            retry_base_delay: Duration::from_millis(self.rpc.retry_delay_ms),
            account_gap: Duration::from_millis(self.rpc.account_gap_ms),
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            retry_attempts: self.rpc.retry_attempts,
            timeout: Duration::from_secs(self.rpc.timeout_secs),
            pacing: self.pacing(),
        }
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            max_wallets: self.discovery.max_wallets,
            candidates_per_transaction: self.discovery.candidates_per_transaction,
            deadline: Duration::from_secs(self.discovery.deadline_secs),
            pacing: self.pacing(),
            public_budget: self.discovery.public.unwrap_or_else(TierBudget::public),
            premium_budget: self.discovery.premium.unwrap_or_else(TierBudget::premium),
        }
    }

    /// Token API settings, `None` when the metadata source is disabled
    pub fn token_api_config(&self) -> Option<JupiterTokenConfig> {
        if !self.metadata.enabled {
            return None;
        }

        let mut config = match self.metadata.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => JupiterTokenConfig::with_api_key(key),
            None => JupiterTokenConfig::default(),
        };
        if let Some(url) = &self.metadata.token_api_url {
            config.token_api_url = url.clone();
        }
        config.timeout = Duration::from_secs(self.metadata.timeout_secs);
        Some(config)
    }
}

/// Expand `$VAR` / `${VAR}` references, leaving the value as-is if a variable is missing
fn expand_header(value: &str) -> String {
    match shellexpand::env(value) {
        Ok(expanded) => expanded.into_owned(),
        Err(e) => {
            tracing::warn!("Header value references an unset variable: {}", e);
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[rpc]
retry_attempts = 2
retry_delay_ms = 50
request_delay_ms = 0
timeout_secs = 10

[[rpc.endpoints]]
url = "https://api.mainnet-beta.solana.com"

[[rpc.endpoints]]
url = "https://mainnet.helius-rpc.com"
headers = { "x-api-key" = "secret" }

[discovery]
max_wallets = 20
deadline_secs = 60

[discovery.premium]
max_accounts = 5
max_signatures_per_account = 10
signature_page_limit = 100

[metadata]
enabled = false

[logging]
level = "info"
"#
        .to_string()
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_valid_config() {
        let config: Config = toml::from_str(&create_valid_config()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.rpc.retry_attempts, 2);
        assert_eq!(config.rpc.endpoints.len(), 2);
        assert_eq!(config.discovery.max_wallets, 20);
        assert_eq!(config.discovery.candidates_per_transaction, 3);
        assert_eq!(config.logging.level, "info");
        assert!(config.token_api_config().is_none());

        let endpoints = config.endpoints();
        assert!(!endpoints[0].is_premium());
        assert!(endpoints[1].is_premium());
        assert_eq!(endpoints[1].headers()["x-api-key"], "secret");

        let discovery = config.discovery_config();
        assert_eq!(discovery.premium_budget.max_accounts, 5);
        assert_eq!(discovery.premium_budget.wallet_cap, None);
        assert_eq!(discovery.public_budget, TierBudget::public());
        assert_eq!(discovery.deadline, Duration::from_secs(60));
    }

    #[test]
    fn test_load_config_file() {
        let file = write_config("[discovery]\nmax_wallets = 7\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.rpc.endpoints[0].url, DEFAULT_RPC_URL);
        assert_eq!(config.rpc.request_delay_ms, 250);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.rpc.retry_attempts, 3);
        assert_eq!(config.rpc.retry_delay_ms, 100);
        assert_eq!(config.rpc.timeout_secs, 30);
        assert_eq!(config.discovery.max_wallets, 50);
        assert_eq!(config.discovery.deadline_secs, 300);
        assert!(config.metadata.enabled);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let file = write_config("[rpc\nretry_attempts = ");
        assert!(matches!(load_config(file.path()).unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.rpc.endpoints.clear();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = Config::default();
        config.rpc.endpoints[0].url = "ws://localhost:8900".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rpc.retry_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.discovery.max_wallets = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.discovery.candidates_per_transaction = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("SOLANA_RPC_URLS", "https://a.example.com, https://b.example.com,"),
                ("RPC_RETRY_ATTEMPTS", "5"),
                ("RPC_RETRY_DELAY_MS", "200"),
                ("RPC_REQUEST_DELAY_MS", "0"),
                ("MAX_WALLETS_DISPLAY", "10"),
                ("JUPITER_API_KEY", "jup-key"),
            ]))
            .unwrap();

        let urls: Vec<_> = config.rpc.endpoints.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example.com", "https://b.example.com"]);
        assert_eq!(config.rpc.retry_attempts, 5);
        assert_eq!(config.rpc.retry_delay_ms, 200);
        assert_eq!(config.rpc.request_delay_ms, 0);
        assert_eq!(config.discovery.max_wallets, 10);

        let token_api = config.token_api_config().unwrap();
        assert_eq!(token_api.api_key.as_deref(), Some("jup-key"));
    }

    #[test]
    fn test_config_api_key_wins_over_env() {
        let mut config = Config::default();
        config.metadata.api_key = Some("from-file".to_string());
        config
            .apply_overrides(lookup(&[("JUPITER_API_KEY", "from-env")]))
            .unwrap();
        assert_eq!(config.metadata.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_bad_numeric_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(lookup(&[("RPC_RETRY_ATTEMPTS", "three")]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_executor_and_pacing() {
        let config = Config::default();
        let exec = config.executor_config();
        assert_eq!(exec.retry_attempts, 3);
        assert_eq!(exec.timeout, Duration::from_secs(30));
        assert_eq!(exec.pacing.request_delay, Duration::from_millis(250));
        assert_eq!(exec.pacing.account_gap, Duration::from_secs(3));
    }
}
