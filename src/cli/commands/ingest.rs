//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::dispatch::classify;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ingest command over one or more references.
///
/// Every reference is attempted; the command fails if any of them failed.
pub async fn run_ingest(references: &[String], settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let mut failed = 0;
    for reference in references {
        if let Err(e) = ingest_one(&orchestrator, reference).await {
            Output::error(&format!("{}: {}", reference, e));
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} references failed", failed, references.len());
    }

    Ok(())
}

/// Ingest a single reference with progress output.
pub async fn ingest_one(orchestrator: &Orchestrator, reference: &str) -> Result<()> {
    let kind = classify(reference)?;

    if let Err(e) = preflight::check(Operation::Ingest(kind), orchestrator.settings()) {
        Output::warning(&format!("{} (run 'medley doctor' for details)", e));
    }

    let spinner = Output::spinner(&format!("Extracting {} ...", kind));
    let result = orchestrator.ingest(reference).await;
    spinner.finish_and_clear();

    let result = result?;

    if let Some(err) = &result.extraction_error {
        Output::warning(&format!("Extraction failed, stored empty text: {}", err));
    } else if result.chars == 0 {
        Output::warning(&format!("No text could be extracted from {}", reference));
    }

    Output::success(&format!(
        "Ingested {} ({}, {} characters, source #{})",
        reference, result.kind, result.chars, result.source_id
    ));

    Ok(())
}
