//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagEngine;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, top_k: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'kenning doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let mut engine = RagEngine::from_settings(&settings).await?;
    if let Some(top_k) = top_k {
        engine = engine.with_retrieval(top_k, settings.rag.num_candidates);
    }

    let spinner = Output::spinner("Searching knowledge base...");

    match engine.ask(question).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.reply);

            if !response.sources.is_empty() {
                Output::header("Sources");
                for source in &response.sources {
                    Output::search_result(&source.source, source.score, &source.text);
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
