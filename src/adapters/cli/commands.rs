//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the buyer scout.

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::solana::{EndpointProbe, HttpTransport, ProbeReport, ProbeStatus, RpcExecutor, SolanaRpcClient};
use crate::adapters::token_metadata::JupiterTokenSource;
use crate::application::{BuyerScout, CommonBuyers};
use crate::config::{config_from_env, load_config, Config};
use crate::domain::{is_valid_token_address, DiscoveryResult, DiscoveryStatus, EndpointPool};
use crate::ports::{ChainReader, RpcTransport, TokenInfoSource};

/// Config file picked up when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config/mainnet.toml";

/// Buyer Scout - reproducible early-buyer discovery for Solana tokens
#[derive(Parser, Debug)]
#[command(
    name = "buyer-scout",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Reproducible early-buyer discovery for Solana token mints",
    long_about = "Buyer Scout samples the largest holder accounts of a token, walks their oldest \
                  transactions and reports the user wallets involved, in a deterministic order, \
                  over a pool of rotating RPC endpoints."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover early buyers of a token
    Discover(DiscoverCmd),

    /// Find wallets that bought every one of 2-5 tokens
    Common(CommonCmd),

    /// Show the SOL balance of a wallet
    Balance(BalanceCmd),

    /// Check whether an address is a well-formed token address
    Validate(ValidateCmd),

    /// Check reachability and latency of every configured endpoint
    Probe(ProbeCmd),
}

/// Output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Discover early buyers
#[derive(Parser, Debug)]
pub struct DiscoverCmd {
    /// Token mint address
    #[arg(value_name = "MINT")]
    pub mint: String,

    /// Only show wallets holding at least this much SOL (0 disables)
    #[arg(long, value_name = "SOL", default_value = "0")]
    pub min_balance: f64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Show at most this many wallets
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

/// Common buyers across tokens
#[derive(Parser, Debug)]
pub struct CommonCmd {
    /// Token mint addresses (2-5)
    #[arg(value_name = "MINT", required = true)]
    pub mints: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Wallet balance
#[derive(Parser, Debug)]
pub struct BalanceCmd {
    /// Wallet address
    #[arg(value_name = "ADDRESS")]
    pub address: String,
}

/// Address validation
#[derive(Parser, Debug)]
pub struct ValidateCmd {
    /// Address to check
    #[arg(value_name = "ADDRESS")]
    pub address: String,
}

/// Endpoint probe
#[derive(Parser, Debug)]
pub struct ProbeCmd {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    let config = resolve_config(app.config.as_deref())?;
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    match app.command {
        Command::Discover(cmd) => discover_command(cmd, &config).await,
        Command::Common(cmd) => common_command(cmd, &config).await,
        Command::Balance(cmd) => balance_command(cmd, &config).await,
        Command::Validate(cmd) => validate_command(cmd),
        Command::Probe(cmd) => probe_command(cmd, &config).await,
    }
}

/// Explicit path, else the default file if present, else defaults plus environment
fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
            load_config(&expanded).with_context(|| format!("Failed to load configuration from {}", expanded))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_config(DEFAULT_CONFIG_PATH).context("Failed to load default configuration")
        }
        None => config_from_env().context("Invalid configuration from environment"),
    }
}

/// Initialize logging system
fn init_logging(verbose: bool, debug: bool, configured: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        configured
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn build_transport() -> Result<Arc<dyn RpcTransport>> {
    let transport = HttpTransport::new().context("Failed to create HTTP client")?;
    Ok(Arc::new(transport))
}

fn build_scout(config: &Config) -> Result<BuyerScout> {
    let pool = EndpointPool::new(config.endpoints()).context("Failed to create endpoint pool")?;
    let executor = RpcExecutor::new(Arc::new(pool), build_transport()?, config.executor_config());
    let chain: Arc<dyn ChainReader> = Arc::new(SolanaRpcClient::new(executor));

    let token_info: Option<Arc<dyn TokenInfoSource>> = match config.token_api_config() {
        Some(token_config) => {
            let source = JupiterTokenSource::with_config(token_config)
                .context("Failed to create token metadata client")?;
            Some(Arc::new(source))
        }
        None => None,
    };

    Ok(BuyerScout::new(chain, token_info, config.discovery_config()))
}

/// Handle discover command
async fn discover_command(cmd: DiscoverCmd, config: &Config) -> Result<()> {
    if !is_valid_token_address(&cmd.mint) {
        bail!("Invalid token address: {}", cmd.mint);
    }

    tracing::info!("Discovering buyers for {}", cmd.mint);
    let scout = build_scout(config)?;
    let result = scout.discover_buyers(&cmd.mint).await;

    if result.status == DiscoveryStatus::Failed && result.is_empty() {
        bail!("Discovery failed for {} (see logs for the RPC error)", cmd.mint);
    }

    let result = trim_result(result, cmd.min_balance, cmd.limit);

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => println!("{}", render_discovery(&cmd.mint, &result, cmd.min_balance)),
    }

    Ok(())
}

/// Apply the minimum-balance filter and the display limit
fn trim_result(result: DiscoveryResult, min_balance: f64, limit: Option<usize>) -> DiscoveryResult {
    let DiscoveryResult {
        observations,
        token_meta,
        status,
        stats,
    } = result;

    let mut observations = BuyerScout::retain_min_balance(observations, min_balance);
    if let Some(limit) = limit {
        observations.truncate(limit);
    }

    DiscoveryResult {
        observations,
        token_meta,
        status,
        stats,
    }
}

fn render_discovery(mint: &str, result: &DiscoveryResult, min_balance: f64) -> String {
    let meta = &result.token_meta;
    let mut lines = vec![
        format!("Token: {} ({})", meta.display_name(), meta.display_symbol()),
        format!("Mint: {}", mint),
    ];

    if let Some(supply) = meta.ui_supply() {
        lines.push(format!("Supply: {:.2}", supply));
    }
    lines.push(format!(
        "Status: {:?} | {} wallets | {} RPC calls",
        result.status,
        result.len(),
        result.stats.rpc_calls
    ));
    if min_balance > 0.0 {
        lines.push(format!("Minimum balance: {} SOL", min_balance));
    }

    if result.is_empty() {
        lines.push("No early buyers found".to_string());
        return lines.join("\n");
    }

    lines.push(String::new());
    for (index, observation) in result.observations.iter().enumerate() {
        lines.push(format!(
            "{:>3}. {:<44} {:>12.4} SOL  {}",
            index + 1,
            observation.address,
            observation.balance_sol,
            format_timestamp(observation.timestamp())
        ));
    }

    lines.join("\n")
}

fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Handle common command
async fn common_command(cmd: CommonCmd, config: &Config) -> Result<()> {
    let scout = build_scout(config)?;
    let common = scout
        .common_buyers(&cmd.mints)
        .await
        .context("Common buyer search failed")?;

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&common)?),
        OutputFormat::Text => println!("{}", render_common(&common)),
    }

    Ok(())
}

fn render_common(common: &CommonBuyers) -> String {
    let mut lines = Vec::new();
    for (index, token) in common.tokens.iter().enumerate() {
        lines.push(format!(
            "Token {}: {} ({}) - {} buyers",
            index + 1,
            token.token_meta.display_name(),
            token.token_meta.display_symbol(),
            token.wallet_count
        ));
    }

    lines.push(format!(
        "Common wallets: {} ({:.1}% overlap)",
        common.wallets.len(),
        common.overlap_rate()
    ));

    if common.wallets.is_empty() {
        lines.push("No wallets bought all of these tokens".to_string());
    } else {
        lines.push(String::new());
        for (index, wallet) in common.wallets.iter().enumerate() {
            lines.push(format!("{:>3}. {}", index + 1, wallet));
        }
    }

    lines.join("\n")
}

/// Handle balance command
async fn balance_command(cmd: BalanceCmd, config: &Config) -> Result<()> {
    let scout = build_scout(config)?;
    let balance = scout.balance_of(&cmd.address).await;
    println!("{}: {:.4} SOL", cmd.address, balance);
    Ok(())
}

/// Handle validate command
fn validate_command(cmd: ValidateCmd) -> Result<()> {
    if !is_valid_token_address(&cmd.address) {
        bail!("Invalid token address: {}", cmd.address);
    }
    println!("Valid token address: {}", cmd.address);
    Ok(())
}

/// Handle probe command
async fn probe_command(cmd: ProbeCmd, config: &Config) -> Result<()> {
    let probe = EndpointProbe::new(
        build_transport()?,
        Duration::from_secs(config.rpc.probe_timeout_secs),
    );
    let reports = probe.probe_all(&config.endpoints()).await;

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => println!("{}", render_probe(&reports)),
    }

    if !reports.iter().any(ProbeReport::is_ok) {
        bail!("No configured endpoint is reachable");
    }
    Ok(())
}

fn render_probe(reports: &[ProbeReport]) -> String {
    reports
        .iter()
        .map(|report| {
            let status = match &report.status {
                ProbeStatus::Ok => format!(
                    "OK {}ms (solana-core {})",
                    report.latency.as_millis(),
                    report.version.as_deref().unwrap_or("?")
                ),
                ProbeStatus::HttpError(code) => format!("HTTP {}", code),
                ProbeStatus::Timeout => "TIMEOUT".to_string(),
                ProbeStatus::Failed(reason) => format!("FAILED {}", reason),
            };
            format!("{:<9} {}  {}", format!("{:?}", report.tier), report.url, status)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DiscoveryStats, EndpointTier, SignatureRecord, TokenMeta, WalletObservation};

    fn result_with(balances: &[(&str, f64)]) -> DiscoveryResult {
        let observations = balances
            .iter()
            .enumerate()
            .map(|(i, (address, balance))| {
                let record = SignatureRecord {
                    signature: format!("sig{}", i),
                    block_time: Some(1_700_000_000 + i as i64),
                    account_index: 0,
                    sig_index: i,
                };
                WalletObservation::new(*address, *balance, &record)
            })
            .collect();

        DiscoveryResult {
            observations,
            token_meta: TokenMeta {
                name: Some("Bonk".to_string()),
                symbol: Some("BONK".to_string()),
                decimals: Some(5),
                supply: None,
            },
            status: DiscoveryStatus::Complete,
            stats: DiscoveryStats::default(),
        }
    }

    #[test]
    fn test_parse_discover_command() {
        let app = CliApp::try_parse_from([
            "buyer-scout",
            "discover",
            "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
            "--min-balance",
            "1.5",
            "--format",
            "json",
            "--limit",
            "10",
        ])
        .unwrap();

        match app.command {
            Command::Discover(cmd) => {
                approx::assert_relative_eq!(cmd.min_balance, 1.5);
                assert_eq!(cmd.format, OutputFormat::Json);
                assert_eq!(cmd.limit, Some(10));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let app = CliApp::try_parse_from(["buyer-scout", "probe", "--debug", "-c", "custom.toml"]).unwrap();
        assert!(app.debug);
        assert_eq!(app.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_common_requires_mints() {
        assert!(CliApp::try_parse_from(["buyer-scout", "common"]).is_err());
    }

    #[test]
    fn test_trim_result_filters_then_limits() {
        let result = result_with(&[("A", 2.0), ("B", 0.1), ("C", 3.0), ("D", 5.0)]);
        let trimmed = trim_result(result, 1.0, Some(2));
        assert_eq!(trimmed.wallets(), vec!["A", "C"]);
    }

    #[test]
    fn test_render_discovery() {
        let text = render_discovery("mint", &result_with(&[("A", 2.0)]), 0.0);
        assert!(text.contains("Token: Bonk (BONK)"));
        assert!(text.contains("1 wallets"));
        assert!(text.contains("2023-11-14 22:13:20 UTC"));

        let empty = render_discovery("mint", &result_with(&[]), 0.0);
        assert!(empty.contains("No early buyers found"));
    }

    #[test]
    fn test_render_probe() {
        let reports = vec![ProbeReport {
            url: "https://rpc.example.com".to_string(),
            tier: EndpointTier::Public,
            status: ProbeStatus::HttpError(429),
            latency: Duration::from_millis(12),
            version: None,
        }];
        assert!(render_probe(&reports).contains("HTTP 429"));
    }
}
