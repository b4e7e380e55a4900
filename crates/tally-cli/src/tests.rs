//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Parser;
use tally_core::{AiBackendKind, CategoryStore, EngineConfig, YamlCategoryStore};

use crate::cli::{Cli, Commands, TransactionArgs};
use crate::commands::{self, truncate};

fn test_config(dir: &Path) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.ai.backend = AiBackendKind::None;
    config.ai.requests_per_minute = 0;
    config.data_dir = Some(dir.to_path_buf());
    config
}

fn tx_args(party: &str, debtor: bool) -> TransactionArgs {
    TransactionArgs {
        party: party.to_string(),
        debtor,
        amount: 0.0,
        info: String::new(),
        description: String::new(),
        date: None,
    }
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_categorize_args() {
    let cli = Cli::try_parse_from([
        "tally",
        "--data-dir",
        "/tmp/tally",
        "categorize",
        "--party",
        "SBB CFF FFS",
        "--debtor",
        "--amount",
        "-8.80",
        "--info",
        "Train ticket",
        "--date",
        "2024-03-15",
    ])
    .unwrap();

    assert_eq!(cli.data_dir.as_deref(), Some(Path::new("/tmp/tally")));
    match cli.command {
        Commands::Categorize { transaction, json } => {
            assert!(!json);
            let tx = transaction.to_transaction();
            assert_eq!(tx.party_name, "SBB CFF FFS");
            assert!(tx.is_debtor);
            assert!((tx.amount + 8.8).abs() < f64::EPSILON);
            assert_eq!(tx.info, "Train ticket");
            assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 3, 15));
            assert!(tx.category.is_none());
        }
        _ => panic!("expected categorize"),
    }
}

#[test]
fn test_parse_rejects_bad_date() {
    let result =
        Cli::try_parse_from(["tally", "explain", "--party", "X", "--date", "15.03.2024"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_requires_party() {
    assert!(Cli::try_parse_from(["tally", "categorize"]).is_err());
    assert!(Cli::try_parse_from(["tally", "map", "--party", "X"]).is_err());
}

#[test]
fn test_parse_global_flags_after_subcommand() {
    let cli =
        Cli::try_parse_from(["tally", "mappings", "--debtor", "-v", "--config", "t.toml"]).unwrap();
    assert!(cli.verbose);
    assert_eq!(cli.config.as_deref(), Some(Path::new("t.toml")));
    assert!(matches!(cli.command, Commands::Mappings { debtor: true }));
}

// ========== Command Tests ==========

#[tokio::test]
async fn test_cmd_categorize_learns_keyword_match() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let mut args = tx_args("SBB CFF FFS", true);
    args.info = "Train ticket".to_string();
    commands::cmd_categorize(&config, &args, false).await.unwrap();

    let store = YamlCategoryStore::new(dir.path());
    assert_eq!(
        store
            .load_debtor_mappings()
            .unwrap()
            .get("sbb cff ffs")
            .map(String::as_str),
        Some("Transportation")
    );
}

#[tokio::test]
async fn test_cmd_categorize_uncategorized_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    commands::cmd_categorize(&config, &tx_args("Hans Muster", false), true)
        .await
        .unwrap();
    assert!(!dir.path().join("creditors.yaml").exists());
}

#[tokio::test]
async fn test_cmd_explain_does_not_learn() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    commands::cmd_explain(&config, &tx_args("Migros", false), false)
        .await
        .unwrap();
    commands::cmd_explain(&config, &tx_args("Migros", false), true)
        .await
        .unwrap();
    assert!(!dir.path().join("creditors.yaml").exists());
}

#[test]
fn test_cmd_map_and_mappings() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    commands::cmd_map(&config, "Landlord AG", "Housing", true).unwrap();
    commands::cmd_map(&config, "Hans Muster", "Transfers", false).unwrap();

    let store = YamlCategoryStore::new(dir.path());
    assert_eq!(
        store
            .load_debtor_mappings()
            .unwrap()
            .get("landlord ag")
            .map(String::as_str),
        Some("Housing")
    );
    assert_eq!(store.load_creditor_mappings().unwrap().len(), 1);

    assert!(commands::cmd_mappings(&config, true).is_ok());
    assert!(commands::cmd_mappings(&config, false).is_ok());
}

#[test]
fn test_cmd_map_rejects_blank_category() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    assert!(commands::cmd_map(&config, "Landlord AG", "  ", true).is_err());
}

#[test]
fn test_cmd_mappings_empty_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("missing"));
    assert!(commands::cmd_mappings(&config, false).is_ok());
}

#[test]
fn test_cmd_categories_with_keyword_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("categories.yaml"),
        "categories:\n  - name: Childcare\n    keywords: [KITA, KRIPPE]\n",
    )
    .unwrap();
    let config = test_config(dir.path());
    assert!(commands::cmd_categories(&config).is_ok());
}

#[test]
fn test_load_config_data_dir_override() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("tally.toml");
    fs::write(
        &config_path,
        "[ai]\nbackend = \"none\"\n\n[store]\ndata_dir = \"/from/file\"\n",
    )
    .unwrap();

    let from_file = commands::load_config(Some(&config_path), None).unwrap();
    assert_eq!(from_file.ai.backend, AiBackendKind::None);

    let overridden =
        commands::load_config(Some(&config_path), Some(Path::new("/from/flag"))).unwrap();
    assert_eq!(overridden.data_dir(), PathBuf::from("/from/flag"));
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a very long party name", 10), "a very ...");
    assert_eq!(truncate("zürich zürich", 8), "züric...");
}
