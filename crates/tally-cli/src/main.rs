//! Tally CLI - Bank statement transaction categorization
//!
//! Usage:
//!   tally categorize --party "SBB CFF FFS" --debtor    Categorize one transaction
//!   tally explain --party "COOP Restaurant"            Show every strategy's answer
//!   tally map --party "Landlord AG" --category Housing --debtor
//!   tally mappings [--debtor]                          List a mapping table
//!   tally categories                                   List categories

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Logs go to stderr so --json output stays machine-readable
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Categorize { transaction, json } => {
            commands::cmd_categorize(&config, &transaction, json).await
        }
        Commands::Explain { transaction, json } => {
            commands::cmd_explain(&config, &transaction, json).await
        }
        Commands::Map {
            party,
            category,
            debtor,
        } => commands::cmd_map(&config, &party, &category, debtor),
        Commands::Mappings { debtor } => commands::cmd_mappings(&config, debtor),
        Commands::Categories => commands::cmd_categories(&config),
    }
}
