//! Balance Oracle

use solana_sdk::native_token::LAMPORTS_PER_SOL;

use crate::ports::ChainReader;

/// SOL balance of an address. Any failure reads as 0.0.
pub async fn balance_of<C: ChainReader + ?Sized>(chain: &C, address: &str) -> f64 {
    match chain.balance_lamports(address).await {
        Ok(lamports) => lamports as f64 / LAMPORTS_PER_SOL as f64,
        Err(e) => {
            tracing::warn!("Balance lookup failed for {}: {}", address, e);
            0.0
        }
    }
}
