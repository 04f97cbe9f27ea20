//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::{Embedder, GeminiEmbedder};
use crate::gemini::GeminiClient;
use crate::knowledge_store::open_reader;
use crate::rag::ContextBuilder;
use anyhow::Result;
use std::sync::Arc;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'kenning doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let client = GeminiClient::from_settings(&settings.gemini)?;
    let embedder: Arc<dyn Embedder> =
        Arc::new(GeminiEmbedder::from_settings(client, &settings.embedding));
    let reader = open_reader(&settings).await?;

    let context_builder = ContextBuilder::new(reader, embedder)
        .with_top_k(limit)
        .with_num_candidates(settings.rag.num_candidates);

    let spinner = Output::spinner("Searching...");
    let results = context_builder.search(query).await;
    spinner.finish_and_clear();

    match results {
        Ok(matches) => {
            if matches.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", matches.len()));

                for m in &matches {
                    Output::search_result(&m.source, m.score, &m.text);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
