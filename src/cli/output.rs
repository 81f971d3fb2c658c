//! CLI output formatting utilities.

use crate::dispatch::ContentKind;
use crate::llm::LLM_ERROR_PREFIX;
use chrono::{DateTime, Local, Utc};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one ingested source.
    pub fn source_info(id: i64, reference: &str, kind: ContentKind, ingested_at: &DateTime<Utc>) {
        println!(
            "  {} {} ({}, #{}, {})",
            style("*").cyan(),
            style(reference).bold(),
            kind,
            id,
            style(ingested_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")).dim()
        );
    }

    /// Print a stored content with a short preview.
    pub fn content_match(reference: &str, text: &str) {
        println!("\n{} {}", style(">>").green(), style(reference).bold());
        if text.trim().is_empty() {
            println!("   {}", style("(no text extracted)").dim());
        } else {
            println!("   {}", content_preview(text, 200));
        }
    }

    /// Print a model answer; error answers go to stderr.
    pub fn answer(text: &str) {
        if text.starts_with(LLM_ERROR_PREFIX) {
            Self::error(text);
        } else if text.is_empty() {
            Self::warning("No answer was generated. Try a more specific question.");
        } else {
            println!("\n{}\n", text);
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Single-line preview, cut at `max_chars` characters.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("a\nb", 10), "a b");
        assert_eq!(content_preview("ééééé", 3), "ééé...");
    }
}
