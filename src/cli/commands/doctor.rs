//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::{ContentStore, SqliteContentStore};
use console::style;
use std::path::PathBuf;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    Output::header("Medley Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("External Tools").bold());
    let tools = &settings.tools;
    let tool_checks = vec![
        check_tool("ffmpeg", &tools.ffmpeg(), "-version", install_hint_ffmpeg()),
        check_tool("ffprobe", &tools.ffprobe(), "-version", install_hint_ffmpeg()),
        check_tool("tesseract", &tools.tesseract(), "--version", install_hint_tesseract()),
        check_tool("yt-dlp", &tools.yt_dlp(), "--version", install_hint_ytdlp()),
    ];
    for check in &tool_checks {
        check.print();
    }
    checks.extend(tool_checks);

    println!();

    println!("{}", style("Model Service").bold());
    let api_check = check_api_key(settings);
    api_check.print();
    checks.push(api_check);
    let endpoint = settings
        .model
        .api_base
        .clone()
        .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
    CheckResult::ok("Endpoint", &endpoint).print();
    CheckResult::ok("Candidates", &settings.model.candidates.join(", ")).print();

    println!();

    println!("{}", style("Storage").bold());
    let dir_checks = check_directories(settings).await;
    for check in &dir_checks {
        check.print();
    }
    checks.extend(dir_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Ingestion of some formats or questions will fail.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! Medley is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, program: &str, version_arg: &str, hint: &str) -> CheckResult {
    match Command::new(program).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            // tesseract prints its version to stderr
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let version = stdout
                .lines()
                .chain(stderr.lines())
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or("installed")
                .to_string();

            let version_display = if version.chars().count() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else {
                version
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, &format!("not found ({})", program), hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Check that a model service API key is configured.
fn check_api_key(settings: &Settings) -> CheckResult {
    match settings.api_key() {
        Some(key) if key.chars().count() > 12 => {
            let chars: Vec<char> = key.chars().collect();
            let masked = format!(
                "{}...{}",
                chars[..7].iter().collect::<String>(),
                chars[chars.len() - 4..].iter().collect::<String>()
            );
            CheckResult::ok("API key", &format!("configured ({})", masked))
        }
        Some(_) => CheckResult::warning(
            "API key",
            "set but looks too short",
            "Check OPENAI_API_KEY or model.api_key",
        ),
        None => CheckResult::error(
            "API key",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...' (needed for questions and transcription)",
        ),
    }
}

/// Check data directories and the content store.
async fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok(
            "Data directory",
            &format!("{}", data_dir.display()),
        ));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let db_path = settings.sqlite_path();
    if !db_path.exists() {
        results.push(CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", db_path.display()),
            "Database will be created on first ingestion",
        ));
        return results;
    }

    let size = std::fs::metadata(&db_path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "unknown size".to_string());

    let counts = match SqliteContentStore::new(&db_path) {
        Ok(store) => store.counts().await,
        Err(e) => Err(e),
    };

    match counts {
        Ok(counts) => results.push(CheckResult::ok(
            "Database",
            &format!(
                "{} ({}, {} sources, {} contents)",
                db_path.display(),
                size,
                counts.sources,
                counts.contents
            ),
        )),
        Err(e) => results.push(CheckResult::error(
            "Database",
            &format!("{} ({})", db_path.display(), e),
            "Move the file aside to start with an empty store",
        )),
    }

    results
}

/// Check if config file exists.
fn check_config_file(config_path: Option<PathBuf>) -> CheckResult {
    let config_path = config_path.unwrap_or_else(Settings::default_config_path);
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: medley config edit",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for Tesseract.
fn install_hint_tesseract() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install tesseract (or set TESSERACT_CMD)"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install tesseract-ocr (or set TESSERACT_CMD)"
    } else {
        "Install from: https://github.com/tesseract-ocr/tesseract (or set TESSERACT_CMD)"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_missing_tool_is_error() {
        let result = check_tool("tesseract", "/nonexistent/tesseract", "--version", "hint");
        assert_eq!(result.status, CheckStatus::Error);
    }

    #[test]
    fn test_configured_key_is_masked() {
        let mut settings = Settings::default();
        settings.model.api_key = Some("sk-abcdefghijklmnop1234".to_string());
        let result = check_api_key(&settings);
        assert_eq!(result.status, CheckStatus::Ok);
        assert_eq!(result.message, "configured (sk-abcd...1234)");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }
}
