//! Token Metadata Adapter
//!
//! Off-chain token names and symbols from the Jupiter token API. On-chain
//! decimals and supply come from the RPC client instead.

mod client;
mod types;

pub use client::{JupiterTokenConfig, JupiterTokenSource};
pub use types::JupiterToken;
