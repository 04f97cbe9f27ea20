//! Gemini embeddings implementation.

use super::{Embedder, TaskType};
use crate::config::EmbeddingSettings;
use crate::error::{KenningError, Result};
use crate::gemini::{model_resource, GeminiClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Gemini accepts at most this many requests per batchEmbedContents call.
const MAX_BATCH_SIZE: usize = 100;

/// Gemini-based embedder.
pub struct GeminiEmbedder {
    client: GeminiClient,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl GeminiEmbedder {
    /// Create a new Gemini embedder with default settings.
    pub fn new(client: GeminiClient) -> Self {
        Self::with_config(client, "text-embedding-004", 768)
    }

    /// Create a new Gemini embedder with custom model and dimensions.
    pub fn with_config(client: GeminiClient, model: &str, dimensions: usize) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
            batch_size: MAX_BATCH_SIZE,
        }
    }

    /// Create an embedder from settings.
    pub fn from_settings(client: GeminiClient, settings: &EmbeddingSettings) -> Self {
        Self::with_config(client, &settings.model, settings.dimensions as usize)
            .with_batch_size(settings.batch_size)
    }

    /// Limit the number of inputs sent per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()], task).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| KenningError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String], task: TaskType) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let model = model_resource(&self.model);
        let url = self.client.model_url(&self.model, "batchEmbedContents");
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let request = BatchEmbedRequest {
                requests: chunk
                    .iter()
                    .map(|text| EmbedContentRequest {
                        model: &model,
                        content: Content {
                            parts: vec![Part { text }],
                        },
                        task_type: task,
                        output_dimensionality: self.dimensions,
                    })
                    .collect(),
            };

            let response: BatchEmbedResponse = self
                .client
                .post_json(&url, &request, KenningError::Embedding)
                .await?;

            all_embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
