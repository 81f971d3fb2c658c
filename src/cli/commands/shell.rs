//! Interactive menu loop.

use super::ask::ask_and_print;
use super::ingest::ingest_one;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Read one trimmed line; `None` on end of input.
fn prompt_line(label: &str) -> Result<Option<String>> {
    print!("{} ", style(label).green().bold());
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Run the interactive shell.
pub async fn run_shell(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check_api_key(&settings) {
        Output::warning(&format!("{} Questions will fail until this is fixed.", e));
    }

    let orchestrator = Orchestrator::new(settings)?;

    println!("\n{}", style("Medley").bold().cyan());
    println!("  1. Ingest file or YouTube url");
    println!("  2. Ask a question");
    println!("  3. Exit");

    loop {
        let Some(choice) = prompt_line("\nSelect option:")? else {
            break;
        };

        match choice.as_str() {
            "1" => {
                let Some(reference) = prompt_line("Enter file path or YouTube url:")? else {
                    break;
                };
                if reference.is_empty() {
                    continue;
                }
                if let Err(e) = ingest_one(&orchestrator, &reference).await {
                    Output::error(&e.to_string());
                }
            }
            "2" => {
                let Some(question) = prompt_line("Enter your question:")? else {
                    break;
                };
                if question.is_empty() {
                    continue;
                }
                if let Err(e) = ask_and_print(&orchestrator, &question).await {
                    Output::error(&e.to_string());
                }
            }
            "3" | "exit" | "quit" => break,
            _ => Output::warning("Invalid choice."),
        }
    }

    Output::info("Goodbye!");
    Ok(())
}
