//! Engine configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override file (explicit path, or ~/.local/share/tally/config/tally.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Environment variables are applied on top of whichever file was used:
//! - `TALLY_AI_BACKEND`: openai_compatible, ollama, mock, none
//! - `TALLY_AI_HOST`: provider base URL
//! - `TALLY_AI_MODEL`: completion model
//! - `TALLY_EMBEDDING_MODEL`: embedding model
//! - `TALLY_AI_API_KEY` (or `OPENAI_API_KEY`): provider API key
//! - `TALLY_AI_RPM`: requests-per-minute budget for categorization calls
//! - `TALLY_DATA_DIR`: directory holding categories.yaml / creditors.yaml / debtors.yaml

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/tally.toml");

/// Which AI provider implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiBackendKind {
    /// Any server implementing the OpenAI chat completions + embeddings API
    OpenAICompatible,
    /// Ollama HTTP API
    Ollama,
    /// In-process mock (development only)
    Mock,
    /// AI disabled
    None,
}

impl AiBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAICompatible => "openai_compatible",
            Self::Ollama => "ollama",
            Self::Mock => "mock",
            Self::None => "none",
        }
    }
}

impl std::str::FromStr for AiBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai_compatible" | "openai" | "vllm" | "localai" => Ok(Self::OpenAICompatible),
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            "none" | "disabled" | "off" => Ok(Self::None),
            _ => Err(format!("Unknown AI backend: {}", s)),
        }
    }
}

impl std::fmt::Display for AiBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// AI provider settings
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub backend: AiBackendKind,
    pub host: Option<String>,
    pub model: String,
    pub embedding_model: String,
    /// Never read from the config file; environment only
    pub api_key: Option<String>,
    /// 0 disables client-side rate limiting
    pub requests_per_minute: u32,
    pub timeout: Duration,
    pub embedding_timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: AiBackendKind::OpenAICompatible,
            host: Some("https://api.openai.com".to_string()),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            api_key: None,
            requests_per_minute: 10,
            timeout: Duration::from_secs(30),
            embedding_timeout: Duration::from_secs(15),
        }
    }
}

/// Which optional strategies take part in the chain
#[derive(Debug, Clone, Copy)]
pub struct StrategyToggles {
    pub semantic: bool,
    pub ai: bool,
}

impl Default for StrategyToggles {
    fn default() -> Self {
        Self {
            semantic: true,
            ai: true,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub ai: AiConfig,
    pub strategies: StrategyToggles,
    /// Directory of the YAML category store (None = platform default)
    pub data_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Load config (override file first, then embedded default) and apply
    /// environment overrides
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let mut config = load_config(override_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse config from TOML content without environment overrides
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }

    /// Apply overrides from a key lookup (environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("TALLY_AI_BACKEND") {
            match backend.parse() {
                Ok(kind) => self.ai.backend = kind,
                Err(e) => tracing::warn!(backend = %backend, "{}, keeping {}", e, self.ai.backend),
            }
        }
        if let Some(host) = lookup("TALLY_AI_HOST") {
            self.ai.host = Some(host);
        }
        if let Some(model) = lookup("TALLY_AI_MODEL") {
            self.ai.model = model;
        }
        if let Some(model) = lookup("TALLY_EMBEDDING_MODEL") {
            self.ai.embedding_model = model;
        }
        if let Some(key) = lookup("TALLY_AI_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            if !key.trim().is_empty() {
                self.ai.api_key = Some(key);
            }
        }
        if let Some(rpm) = lookup("TALLY_AI_RPM") {
            match rpm.trim().parse() {
                Ok(value) => self.ai.requests_per_minute = value,
                Err(_) => tracing::warn!(value = %rpm, "Ignoring invalid TALLY_AI_RPM"),
            }
        }
        if let Some(dir) = lookup("TALLY_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Directory holding the category store files
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(default_data_dir)
            .unwrap_or_else(|| PathBuf::from("tally-data"))
    }
}

/// Default data directory (~/.local/share/tally on Linux)
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally"))
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    default_data_dir().map(|d| d.join("config").join("tally.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&Path>) -> Result<EngineConfig> {
    let path = override_path
        .map(Path::to_path_buf)
        .or_else(default_config_path);

    let content = match path {
        Some(ref p) if p.exists() => fs::read_to_string(p)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", p.display(), e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    ai: Option<RawAi>,
    strategies: Option<RawStrategies>,
    store: Option<RawStore>,
}

#[derive(Debug, Deserialize)]
struct RawAi {
    backend: Option<String>,
    host: Option<String>,
    model: Option<String>,
    embedding_model: Option<String>,
    requests_per_minute: Option<u32>,
    timeout_secs: Option<u64>,
    embedding_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawStrategies {
    semantic: Option<bool>,
    ai: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawStore {
    data_dir: Option<PathBuf>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<EngineConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = EngineConfig::default();

    if let Some(ai) = raw.ai {
        if let Some(backend) = ai.backend {
            config.ai.backend = backend.parse().map_err(Error::Config)?;
        }
        if let Some(host) = ai.host {
            config.ai.host = if host.trim().is_empty() {
                None
            } else {
                Some(host)
            };
        }
        if let Some(model) = ai.model {
            config.ai.model = model;
        }
        if let Some(model) = ai.embedding_model {
            config.ai.embedding_model = model;
        }
        if let Some(rpm) = ai.requests_per_minute {
            config.ai.requests_per_minute = rpm;
        }
        if let Some(secs) = ai.timeout_secs {
            config.ai.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = ai.embedding_timeout_secs {
            config.ai.embedding_timeout = Duration::from_secs(secs);
        }
    }

    if let Some(strategies) = raw.strategies {
        if let Some(semantic) = strategies.semantic {
            config.strategies.semantic = semantic;
        }
        if let Some(ai) = strategies.ai {
            config.strategies.ai = ai;
        }
    }

    if let Some(store) = raw.store {
        config.data_dir = store.data_dir;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.ai.backend, AiBackendKind::OpenAICompatible);
        assert_eq!(config.ai.requests_per_minute, 10);
        assert!(config.ai.api_key.is_none());
        assert!(config.strategies.semantic);
        assert!(config.strategies.ai);
    }

    #[test]
    fn test_parse_partial_config() {
        let config = parse_config(
            r#"
            [ai]
            backend = "ollama"
            host = "http://localhost:11434"
            timeout_secs = 5

            [strategies]
            semantic = false
            "#,
        )
        .unwrap();

        assert_eq!(config.ai.backend, AiBackendKind::Ollama);
        assert_eq!(config.ai.host.as_deref(), Some("http://localhost:11434"));
        assert_eq!(config.ai.timeout, Duration::from_secs(5));
        assert!(!config.strategies.semantic);
        assert!(config.strategies.ai);
    }

    #[test]
    fn test_parse_unknown_backend_is_error() {
        let result = parse_config("[ai]\nbackend = \"gemini-pro-max\"\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_malformed_toml_is_error() {
        assert!(parse_config("[ai\nbackend = ").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_AI_BACKEND", "mock"),
            ("OPENAI_API_KEY", "sk-test"),
            ("TALLY_AI_RPM", "60"),
            ("TALLY_DATA_DIR", "/tmp/tally-test"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.ai.backend, AiBackendKind::Mock);
        assert_eq!(config.ai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.ai.requests_per_minute, 60);
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/tally-test"));
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let mut config = EngineConfig::default();
        config.apply_overrides(|key| match key {
            "TALLY_AI_BACKEND" => Some("nonsense".to_string()),
            "TALLY_AI_RPM" => Some("fast".to_string()),
            "TALLY_AI_API_KEY" => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(config.ai.backend, AiBackendKind::OpenAICompatible);
        assert_eq!(config.ai.requests_per_minute, 10);
        assert!(config.ai.api_key.is_none());
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!(
            "OpenAI".parse::<AiBackendKind>().unwrap(),
            AiBackendKind::OpenAICompatible
        );
        assert_eq!("off".parse::<AiBackendKind>().unwrap(), AiBackendKind::None);
        assert!("bard".parse::<AiBackendKind>().is_err());
    }
}
