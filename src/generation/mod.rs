//! Text generation by a hosted language model.

mod gemini;

pub use gemini::GeminiGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for generative model backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Send a single composed prompt and return the model's text reply.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logs and diagnostics.
    fn model(&self) -> &str;
}
