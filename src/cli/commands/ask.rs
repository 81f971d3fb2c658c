//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'medley doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    ask_and_print(&orchestrator, question).await
}

/// Ask a question and print the answer with its grounding.
pub(crate) async fn ask_and_print(orchestrator: &Orchestrator, question: &str) -> Result<()> {
    let spinner = Output::spinner("Thinking...");
    let outcome = orchestrator.ask(question).await;
    spinner.finish_and_clear();

    let outcome = outcome?;
    Output::answer(&outcome.answer);

    if let Some(source) = &outcome.source {
        Output::kv("Source", source);
    }
    if let Some(preview) = &outcome.context_preview {
        Output::kv("Context", &preview.replace('\n', " "));
    }

    Ok(())
}
