//! Shared command utilities
//!
//! This module contains:
//! - `load_config` - Resolve engine config with CLI overrides
//! - `open_categorizer` - Categorizer with the configured AI backend
//! - `open_local_categorizer` - Categorizer without AI, for table edits

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tally_core::{AIClient, Categorizer, EngineConfig, YamlCategoryStore};
use tracing::debug;

/// Load config; `--data-dir` wins over the file and the environment
pub fn load_config(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(config_path).context("Failed to load config")?;
    if let Some(dir) = data_dir {
        config.data_dir = Some(dir.to_path_buf());
    }
    debug!(data_dir = %config.data_dir().display(), backend = %config.ai.backend, "Config loaded");
    Ok(config)
}

fn open_store(config: &EngineConfig) -> Arc<YamlCategoryStore> {
    Arc::new(YamlCategoryStore::new(config.data_dir()))
}

/// Build a categorizer and wait for the category embeddings
pub async fn open_categorizer(config: &EngineConfig) -> Categorizer {
    let ai = AIClient::from_config(&config.ai);
    let categorizer = Categorizer::new(open_store(config), ai, config);
    categorizer.wait_until_ready().await;
    categorizer
}

/// Build a categorizer that never calls an AI backend
pub fn open_local_categorizer(config: &EngineConfig) -> Categorizer {
    Categorizer::new(open_store(config), None, config)
}
