//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Solana: HTTP transport, resilient RPC executor, typed chain reads, endpoint probe
//! - Token metadata: Jupiter token API client
//! - CLI: Command-line interface handlers

pub mod cli;
pub mod solana;
pub mod token_metadata;

pub use cli::CliApp;
pub use solana::{EndpointProbe, HttpTransport, RpcExecutor, SolanaRpcClient};
pub use token_metadata::JupiterTokenSource;
