//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::{Settings, StoreProvider, GEMINI_API_KEY_ENV, MONGO_URI_ENV};
use crate::error::{KenningError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion needs the embedding provider and a writable store.
    Ingest,
    /// Asking questions needs both providers and the store.
    Ask,
    /// Search needs the embedding provider and the store.
    Search,
    /// Stats only reads the store.
    Stats,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ingest | Operation::Ask | Operation::Search => {
            check_api_key(settings)?;
            check_store(settings)?;
        }
        Operation::Stats => {
            check_store(settings)?;
        }
    }
    Ok(())
}

/// Check that a Gemini API key is configured.
fn check_api_key(settings: &Settings) -> Result<()> {
    match settings.gemini.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err(KenningError::Config(format!(
            "{} not set. Set it with: export {}='...' (or add it to .env)",
            GEMINI_API_KEY_ENV, GEMINI_API_KEY_ENV
        ))),
    }
}

/// Check that the configured store can be opened.
fn check_store(settings: &Settings) -> Result<()> {
    match settings.store.provider {
        StoreProvider::MongoDb => match settings.store.mongo_uri.as_deref() {
            Some(uri) if !uri.trim().is_empty() => Ok(()),
            _ => Err(KenningError::Config(format!(
                "{} not set. Set it with: export {}='mongodb+srv://...' (or use store.provider = \"sqlite\")",
                MONGO_URI_ENV, MONGO_URI_ENV
            ))),
        },
        StoreProvider::Sqlite | StoreProvider::Memory => Ok(()),
    }
}
