//! Configuration settings for Medley.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub store: StoreSettings,
    pub model: ModelSettings,
    pub transcription: TranscriptionSettings,
    pub youtube: YoutubeSettings,
    pub tools: ToolSettings,
    pub ingest: IngestSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.medley".to_string(),
            temp_dir: "/tmp/medley".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Content store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path to the SQLite database.
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.medley/medley.db".to_string(),
        }
    }
}

/// Generative model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Preferred model identifiers, probed in order at startup.
    pub candidates: Vec<String>,
    /// Identifier used when no candidate answers the probe.
    pub default_model: String,
    /// Maximum number of context characters sent with a question.
    pub max_context_chars: usize,
    /// Base URL of an OpenAI-compatible API (None = api.openai.com).
    pub api_base: Option<String>,
    /// API key. Falls back to OPENAI_API_KEY when unset.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            candidates: vec![
                "gpt-4o-mini".to_string(),
                "gpt-4o".to_string(),
                "gpt-4.1-mini".to_string(),
                "gpt-4.1".to_string(),
                "gpt-4-turbo".to_string(),
                "gpt-3.5-turbo".to_string(),
            ],
            default_model: "gpt-4o-mini".to_string(),
            max_context_chars: 12_000,
            api_base: None,
            api_key: None,
            timeout_seconds: 300,
        }
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Speech recognition model.
    pub model: String,
    /// Optional language hint (ISO-639-1).
    pub language: Option<String>,
    /// Largest waveform uploaded in one request; longer audio is split.
    pub max_upload_bytes: u64,
    /// Length of each chunk when splitting, in seconds.
    pub chunk_seconds: u32,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
            max_upload_bytes: 24 * 1024 * 1024,
            chunk_seconds: 600,
        }
    }
}

/// YouTube-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// Caption language tried before any other track.
    pub preferred_language: String,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            preferred_language: "en".to_string(),
        }
    }
}

/// Locations of external executables.
///
/// Unset fields fall back to the matching environment variable and then to
/// the bare program name resolved through PATH.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ToolSettings {
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
    pub tesseract: Option<String>,
    pub yt_dlp: Option<String>,
}

impl ToolSettings {
    pub fn ffmpeg(&self) -> String {
        Self::resolve(&self.ffmpeg, "FFMPEG_BINARY", "ffmpeg")
    }

    pub fn ffprobe(&self) -> String {
        Self::resolve(&self.ffprobe, "FFPROBE_BINARY", "ffprobe")
    }

    pub fn tesseract(&self) -> String {
        Self::resolve(&self.tesseract, "TESSERACT_CMD", "tesseract")
    }

    pub fn yt_dlp(&self) -> String {
        Self::resolve(&self.yt_dlp, "YT_DLP_BINARY", "yt-dlp")
    }

    fn resolve(configured: &Option<String>, env_key: &str, fallback: &str) -> String {
        configured
            .as_ref()
            .filter(|p| !p.is_empty())
            .map(|p| shellexpand::tilde(p).to_string())
            .or_else(|| std::env::var(env_key).ok().filter(|p| !p.is_empty()))
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Ingestion policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Store an empty-text record when an image, audio or video backend fails.
    pub store_empty_on_failure: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            store_empty_on_failure: true,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::MedleyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("medley")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }

    /// Model service API key from config or environment.
    pub fn api_key(&self) -> Option<String> {
        self.model
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()))
    }
}
