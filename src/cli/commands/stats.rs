//! Stats command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::knowledge_store::open_reader;
use anyhow::Result;

/// Run the stats command.
pub async fn run_stats(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Stats, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let reader = open_reader(&settings).await?;

    let spinner = Output::spinner("Reading knowledge base...");
    let counts = reader.source_counts().await;
    spinner.finish_and_clear();

    match counts {
        Ok(counts) => {
            if counts.is_empty() {
                Output::info("The knowledge base is empty. Use 'kenning ingest' to add documents.");
            } else {
                Output::header(&format!("Indexed Documents ({})", counts.len()));
                println!();

                for count in &counts {
                    Output::list_item(&format!("{} ({} records)", count.source, count.records));
                }

                let total: usize = counts.iter().map(|c| c.records).sum();
                println!();
                Output::kv("Total documents", &counts.len().to_string());
                Output::kv("Total records", &total.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to read knowledge base: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
