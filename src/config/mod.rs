//! Configuration module for Kenning.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    mask_connection_string, mask_secret, EmbeddingSettings, GeminiSettings, GeneralSettings,
    GenerationSettings, IngestSettings, PromptSettings, RagSettings, ServerSettings, Settings,
    StoreProvider, StoreSettings, CORS_ORIGINS_ENV, GEMINI_API_KEY_ENV, MONGO_URI_ENV,
};
