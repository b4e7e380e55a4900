//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tally_core::Transaction;

/// Tally - Categorize bank statement transactions
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Transaction categorization for bank statements", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Directory holding categories.yaml, creditors.yaml and debtors.yaml
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to <data dir>/config/tally.toml, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Categorize one transaction (learned mappings are saved)
    Categorize {
        #[command(flatten)]
        transaction: TransactionArgs,

        /// Print the category as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what every strategy says about a transaction
    Explain {
        #[command(flatten)]
        transaction: TransactionArgs,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Map a party to a category
    Map {
        /// Party name
        #[arg(short, long)]
        party: String,

        /// Category name
        #[arg(short, long)]
        category: String,

        /// Write to the debtor table instead of the creditor table
        #[arg(long)]
        debtor: bool,
    },

    /// List a mapping table
    Mappings {
        /// List the debtor table instead of the creditor table
        #[arg(long)]
        debtor: bool,
    },

    /// List the category taxonomy and configured keyword categories
    Categories,
}

/// Transaction fields accepted by `categorize` and `explain`
#[derive(Args, Debug, Clone)]
pub struct TransactionArgs {
    /// Counterparty name
    #[arg(short, long)]
    pub party: String,

    /// The party is the debtor (uses the debtor mapping table)
    #[arg(long)]
    pub debtor: bool,

    /// Amount (negative for debits)
    #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub amount: f64,

    /// Remittance info / booking text
    #[arg(short, long, default_value = "")]
    pub info: String,

    /// Description
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Booking date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

impl TransactionArgs {
    pub fn to_transaction(&self) -> Transaction {
        let mut transaction = Transaction::new(self.party.clone(), self.debtor)
            .with_amount(self.amount)
            .with_info(self.info.clone())
            .with_description(self.description.clone());
        if let Some(date) = self.date {
            transaction = transaction.with_date(date);
        }
        transaction
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{}': {}", s, e))
}
