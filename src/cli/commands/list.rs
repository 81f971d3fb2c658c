//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.list_sources().await {
        Ok(sources) => {
            if sources.is_empty() {
                Output::info("Nothing ingested yet. Use 'medley ingest <path-or-url>' to add content.");
            } else {
                Output::header(&format!("Ingested Sources ({})", sources.len()));
                println!();

                for source in &sources {
                    Output::source_info(source.id, &source.reference, source.kind, &source.ingested_at);
                }

                let counts = orchestrator.counts().await?;
                println!();
                Output::kv("Total sources", &counts.sources.to_string());
                Output::kv("Total contents", &counts.contents.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list sources: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
