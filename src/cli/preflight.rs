//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::dispatch::ContentKind;
use crate::error::{MedleyError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingesting a reference of the given kind.
    Ingest(ContentKind),
    /// Asking questions requires an API key.
    Ask,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ingest(kind) => match kind {
            ContentKind::Image => check_tool(&settings.tools.tesseract(), "--version")?,
            ContentKind::Audio | ContentKind::Video => {
                check_api_key(settings)?;
                check_tool(&settings.tools.ffmpeg(), "-version")?;
            }
            ContentKind::Youtube => {
                check_api_key(settings)?;
                check_tool(&settings.tools.yt_dlp(), "--version")?;
                check_tool(&settings.tools.ffmpeg(), "-version")?;
            }
            ContentKind::Pdf | ContentKind::Docx | ContentKind::Pptx | ContentKind::Text => {}
        },
        Operation::Ask => {
            check_api_key(settings)?;
        }
    }
    Ok(())
}

/// Check that a model service API key is configured.
pub fn check_api_key(settings: &Settings) -> Result<()> {
    match settings.api_key() {
        Some(_) => Ok(()),
        None => Err(MedleyError::Config(
            "No API key. Set OPENAI_API_KEY or model.api_key in the config file.".to_string(),
        )),
    }
}

/// Check if an external tool is available.
fn check_tool(program: &str, version_arg: &str) -> Result<()> {
    match Command::new(program).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(MedleyError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            program
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(MedleyError::ToolNotFound(program.to_string()))
        }
        Err(e) => Err(MedleyError::ToolNotFound(format!("{}: {}", program, e))),
    }
}
