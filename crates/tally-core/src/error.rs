//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("AI error: {0}")]
    Ai(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Categorizer not initialized")]
    NotInitialized,
}

pub type Result<T> = std::result::Result<T, Error>;
