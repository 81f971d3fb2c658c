//! Audio stream download with yt-dlp.

use crate::config::ToolSettings;
use crate::error::{MedleyError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, instrument};

/// Downloads the best audio stream of a video into `output_dir`.
///
/// The stream is kept in its native container; callers convert it with
/// [`super::to_waveform`] when needed.
#[instrument(skip(output_dir, tools), fields(video_id = %video_id))]
pub async fn download_audio(
    url: &str,
    video_id: &str,
    output_dir: &Path,
    tools: &ToolSettings,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    info!("Downloading audio from {}", url);

    let yt_dlp = tools.yt_dlp();
    let template = output_dir.join(format!("{}.%(ext)s", video_id));

    let result = Command::new(&yt_dlp)
        .arg("--format").arg("bestaudio/best")
        .arg("--output").arg(&template)
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MedleyError::ToolNotFound(yt_dlp));
        }
        Err(e) => {
            return Err(MedleyError::ToolFailed(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MedleyError::ToolFailed(format!("yt-dlp failed: {}", stderr.trim())));
    }

    find_audio_file(output_dir, video_id)
}

/// Locates a downloaded audio file by video ID.
fn find_audio_file(dir: &Path, video_id: &str) -> Result<PathBuf> {
    for ext in &["m4a", "webm", "opus", "mp3", "ogg", "mp4"] {
        let candidate = dir.join(format!("{}.{}", video_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    // yt-dlp may pick an extension not listed above
    let entries = std::fs::read_dir(dir)
        .map_err(|e| MedleyError::ToolFailed(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(video_id) && !name.ends_with(".part") {
            return Ok(entry.path());
        }
    }

    Err(MedleyError::ToolFailed("Audio file not found after download".into()))
}
