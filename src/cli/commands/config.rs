//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Run the config command against `--config` or the default location.
pub fn run_config(action: &ConfigAction, config_path: Option<PathBuf>, settings: Settings) -> Result<()> {
    let config_path = config_path.unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => println!("{}", render_masked(&settings)?),
        ConfigAction::Edit => edit(&config_path, &settings)?,
        ConfigAction::Path => {
            println!("{}", config_path.display());
            if !config_path.exists() {
                Output::info("File does not exist yet; built-in defaults are in use.");
            }
        }
    }

    Ok(())
}

/// Effective settings as TOML, with the API key hidden.
fn render_masked(settings: &Settings) -> Result<String> {
    let mut shown = settings.clone();
    if let Some(key) = shown.model.api_key.as_mut() {
        *key = mask_secret(key);
    }
    toml::to_string_pretty(&shown).context("Failed to serialize config")
}

fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

/// Open the file in the user's editor, writing defaults first when missing,
/// then check that the result still parses.
fn edit(config_path: &Path, settings: &Settings) -> Result<()> {
    if !config_path.exists() {
        settings.save_to(&config_path.to_path_buf())?;
        Output::info(&format!("Created default config at {}", config_path.display()));
    }

    let editor = std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .unwrap_or_else(|_| "vi".to_string());
    Output::info(&format!("Opening config in {}...", editor));

    match std::process::Command::new(&editor).arg(config_path).status() {
        Ok(status) if status.success() => match validate(config_path) {
            Ok(()) => Output::success("Config saved."),
            Err(e) => Output::error(&format!("Config no longer parses, defaults will be used: {:#}", e)),
        },
        Ok(_) => Output::warning("Editor exited with non-zero status."),
        Err(e) => {
            Output::error(&format!("Failed to open editor '{}': {}", editor, e));
            Output::info(&format!("Config file is at: {}", config_path.display()));
        }
    }

    Ok(())
}

fn validate(config_path: &Path) -> Result<()> {
    Settings::load_from(Some(&config_path.to_path_buf()))
        .map(|_| ())
        .with_context(|| format!("{}", config_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_hides_api_key() {
        let mut settings = Settings::default();
        settings.model.api_key = Some("sk-live-abcdef123456".to_string());

        let rendered = render_masked(&settings).unwrap();
        assert!(rendered.contains("****3456"));
        assert!(!rendered.contains("sk-live"));
    }

    #[test]
    fn test_short_secret_fully_masked() {
        assert_eq!(mask_secret("abc"), "****");
    }

    #[test]
    fn test_validate_reports_broken_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[model]\ndefault_model = \"gpt-4o\"\n").unwrap();
        assert!(validate(&path).is_ok());

        std::fs::write(&path, "[model\ndefault_model = ").unwrap();
        assert!(validate(&path).is_err());
    }
}
