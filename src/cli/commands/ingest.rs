//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{list_documents, DocumentOutcome, Orchestrator};
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(source_dir: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'kenning doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let dir = match source_dir {
        Some(dir) => Settings::expand_path(&dir),
        None => settings.source_dir(),
    };

    let documents = list_documents(&dir, &settings.ingest.extensions).await?;
    if documents.is_empty() {
        Output::warning(&format!(
            "No .{} documents found in {}",
            settings.ingest.extensions.join("/."),
            dir.display()
        ));
    }

    Output::header("Ingesting documents");
    Output::kv("Source", &dir.display().to_string());
    Output::kv("Store", &settings.store.provider.to_string());
    println!();

    let orchestrator = Orchestrator::new(settings).await?;

    let pb = Output::progress_bar(documents.len() as u64, "Embedding...");
    let report = orchestrator
        .ingest_directory_with(&dir, |document| {
            pb.set_message(document.source.clone());
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();
    let report = report?;

    for document in &report.documents {
        match &document.outcome {
            DocumentOutcome::Indexed { records } => Output::list_item(&format!(
                "{} ({}, {} records)",
                document.source, document.category.strategy(), records
            )),
            DocumentOutcome::Skipped(reason) => {
                Output::warning(&format!("Skipped {}: {}", document.source, reason))
            }
        }
    }

    println!();
    Output::success(&format!(
        "Indexed {} records from {} of {} documents",
        report.records_inserted,
        report.indexed_count(),
        report.documents.len()
    ));
    Output::kv("Records in store", &report.total_records.to_string());

    Ok(())
}
