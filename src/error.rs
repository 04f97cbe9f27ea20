//! Error types for Kenning.

use thiserror::Error;

/// Library-level error type for Kenning operations.
#[derive(Error, Debug)]
pub enum KenningError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Client initialization failed: {0}")]
    ClientInit(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Knowledge store error: {0}")]
    KnowledgeStore(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

/// Result type alias for Kenning operations.
pub type Result<T> = std::result::Result<T, KenningError>;
