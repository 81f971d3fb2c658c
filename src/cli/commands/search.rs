//! Search command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.search(query).await {
        Ok(matches) if matches.is_empty() => {
            Output::warning("No stored content contains that text (matching is case-sensitive).");
        }
        Ok(matches) => {
            Output::success(&format!("Found {} results", matches.len()));
            for m in &matches {
                Output::content_match(&m.reference, &m.text);
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
