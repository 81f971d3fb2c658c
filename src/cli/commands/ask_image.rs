//! Image question command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::Path;

/// Run the ask-image command.
pub async fn run_ask_image(
    path: &str,
    question: &str,
    hint: Option<String>,
    ocr: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let path = Path::new(path);

    let hint = if ocr {
        let spinner = Output::spinner("Running OCR...");
        let text = orchestrator.ocr(path).await;
        spinner.finish_and_clear();

        match text {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                Output::warning("OCR found no text; asking without a hint.");
                None
            }
            Err(e) => {
                Output::warning(&format!("OCR failed, asking without a hint: {}", e));
                None
            }
        }
    } else {
        hint
    };

    let spinner = Output::spinner("Looking at the image...");
    let answer = orchestrator
        .ask_about_image(path, question, hint.as_deref())
        .await;
    spinner.finish_and_clear();

    Output::answer(&answer?);
    Ok(())
}
