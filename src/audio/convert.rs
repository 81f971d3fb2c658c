//! Waveform conversion with ffmpeg.

use crate::config::ToolSettings;
use crate::error::{MedleyError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Extensions the speech backend reads without transcoding.
pub const NATIVE_WAVEFORM_EXTENSIONS: &[&str] = &["wav", "aiff", "aif", "flac"];

/// Sample rate of converted waveforms.
const TARGET_SAMPLE_RATE: u32 = 16_000;

/// File name prefix of split chunks.
const CHUNK_PREFIX: &str = "chunk_";

/// Check if a file can be sent to speech recognition as-is.
pub fn is_native_waveform(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| NATIVE_WAVEFORM_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Transcodes any audio or video input into a mono 16 kHz WAV file.
///
/// Video inputs have their video stream dropped. Any failure is reported as
/// `ConversionFailure`.
#[instrument(skip(tools), fields(source = %source.display()))]
pub async fn to_waveform(source: &Path, dest: &Path, tools: &ToolSettings) -> Result<()> {
    let ffmpeg = tools.ffmpeg();
    debug!("Converting {:?} to mono {} Hz WAV", source, TARGET_SAMPLE_RATE);

    let result = Command::new(&ffmpeg)
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-ac").arg("1")
        .arg("-ar").arg(TARGET_SAMPLE_RATE.to_string())
        .arg("-f").arg("wav")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() && dest.exists() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(MedleyError::ConversionFailure(format!(
                "ffmpeg could not convert {}: {}",
                source.display(),
                err.trim()
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
            MedleyError::ConversionFailure(format!("ffmpeg not found at '{}'", ffmpeg)),
        ),
        Err(e) => Err(MedleyError::ConversionFailure(format!("ffmpeg error: {e}"))),
    }
}

/// Splits a WAV file into consecutive chunks of `chunk_seconds` each.
///
/// Chunks are written to `output_dir` and returned in playback order.
#[instrument(skip(tools), fields(source = %source.display()))]
pub async fn split_waveform(
    source: &Path,
    output_dir: &Path,
    chunk_seconds: u32,
    tools: &ToolSettings,
) -> Result<Vec<PathBuf>> {
    let ffmpeg = tools.ffmpeg();
    let pattern = output_dir.join(format!("{}%04d.wav", CHUNK_PREFIX));

    let result = Command::new(&ffmpeg)
        .arg("-i").arg(source)
        .arg("-f").arg("segment")
        .arg("-segment_time").arg(chunk_seconds.max(1).to_string())
        .arg("-reset_timestamps").arg("1")
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(&pattern)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => {}
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            return Err(MedleyError::ConversionFailure(format!(
                "ffmpeg could not split {}: {}",
                source.display(),
                err.trim()
            )));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MedleyError::ConversionFailure(format!(
                "ffmpeg not found at '{}'",
                ffmpeg
            )))
        }
        Err(e) => return Err(MedleyError::ConversionFailure(format!("ffmpeg error: {e}"))),
    }

    let chunks = chunk_files(output_dir)?;
    if chunks.is_empty() {
        return Err(MedleyError::ConversionFailure(format!(
            "ffmpeg produced no chunks for {}",
            source.display()
        )));
    }

    debug!("Split into {} chunks", chunks.len());
    Ok(chunks)
}

/// Chunk files in `dir`, ordered by their zero-padded index.
fn chunk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut chunks: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(CHUNK_PREFIX) && n.ends_with(".wav"))
                .unwrap_or(false)
        })
        .collect();
    chunks.sort();
    Ok(chunks)
}
