//! RAG response generation.

use super::context::format_context_for_prompt;
use super::ContextBuilder;
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, GeminiEmbedder};
use crate::error::Result;
use crate::gemini::GeminiClient;
use crate::generation::{GeminiGenerator, Generator};
use crate::knowledge_store::{open_reader, KnowledgeReader, SearchMatch};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// RAG engine for question answering.
pub struct RagEngine {
    context_builder: ContextBuilder,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
}

impl RagEngine {
    /// Create a new RAG engine with default retrieval settings and prompts.
    pub fn new(
        reader: Arc<dyn KnowledgeReader>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            context_builder: ContextBuilder::new(reader, embedder),
            generator,
            prompts: Prompts::default(),
        }
    }

    /// Build the engine from settings: one Gemini client shared by the
    /// embedder and the generator, plus a read-only store handle.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let client = GeminiClient::from_settings(&settings.gemini)?;
        let embedder: Arc<dyn Embedder> =
            Arc::new(GeminiEmbedder::from_settings(client.clone(), &settings.embedding));
        let generator: Arc<dyn Generator> =
            Arc::new(GeminiGenerator::from_settings(client, &settings.generation));
        let reader = open_reader(settings).await?;

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        info!(
            "RAG engine ready (model: {}, top_k: {})",
            generator.model(),
            settings.rag.top_k
        );

        Ok(Self::new(reader, embedder, generator)
            .with_prompts(prompts)
            .with_retrieval(settings.rag.top_k, settings.rag.num_candidates))
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set how many records are retrieved and the approximate-search candidate pool.
    pub fn with_retrieval(mut self, top_k: usize, num_candidates: usize) -> Self {
        self.context_builder = self
            .context_builder
            .with_top_k(top_k)
            .with_num_candidates(num_candidates);
        self
    }

    /// Ask a single question and get a response.
    ///
    /// Retrieval problems degrade to the no-information reply; only a
    /// generation failure is an error.
    #[instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn ask(&self, question: &str) -> Result<RagResponse> {
        let sources = self.context_builder.build(question).await;

        if sources.is_empty() {
            info!("No relevant context found");
            return Ok(RagResponse {
                reply: self.prompts.rag.no_information_reply.clone(),
                sources,
            });
        }

        let context = format_context_for_prompt(&sources);
        let prompt = self.prompts.grounded_prompt(&context, question);

        let reply = self.generator.generate(&prompt).await?;
        debug!("Generated reply with {} sources", sources.len());

        Ok(RagResponse { reply, sources })
    }
}

/// A RAG response with reply and sources.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The reply text, exactly as generated.
    pub reply: String,
    /// Records the reply was grounded on. Empty for the no-information reply.
    pub sources: Vec<SearchMatch>,
}
