//! CLI Adapter
//!
//! Command-line interface for the buyer scout.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    BalanceCmd, CliApp, Command, CommonCmd, DiscoverCmd, OutputFormat, ProbeCmd, ValidateCmd,
    DEFAULT_CONFIG_PATH,
};

use anyhow::Result;

/// Initialize the CLI application
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    commands::execute(app).await
}
