//! Recent command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Show the newest stored contents.
pub async fn run_recent(limit: usize, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let recent = orchestrator.most_recent(limit).await?;

    if recent.is_empty() {
        Output::info("Nothing ingested yet. Use 'medley ingest <path-or-url>' to add content.");
        return Ok(());
    }

    Output::header(&format!("Most Recent ({})", recent.len()));
    for m in &recent {
        Output::content_match(&m.reference, &m.text);
    }

    Ok(())
}
