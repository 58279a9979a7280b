use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourcingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Marketplace error {code}: {message}")]
    Marketplace { code: i64, message: String },

    #[error("Image search timed out after {0:?}")]
    ImageSearchTimeout(Duration),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SourcingError {
    /// Errors no per-item retry or fallback can fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, SourcingError>;
