//! Buyer Scout - Early-buyer discovery for Solana tokens

use anyhow::Result;

use buyer_scout::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (API keys go here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
