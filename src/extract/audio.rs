//! Audio extraction: transcode to waveform when needed, then transcribe.
//!
//! Waveforms larger than the upload limit are split into chunks that are
//! transcribed one after another and joined in playback order.

use super::Extractor;
use crate::audio::{is_native_waveform, split_waveform, to_waveform};
use crate::config::ToolSettings;
use crate::error::Result;
use crate::transcription::Transcriber;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default upload limit, just under the speech API's 25 MB cap.
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 24 * 1024 * 1024;

/// Default chunk length; 10 minutes of 16 kHz mono is about 19 MB.
const DEFAULT_CHUNK_SECONDS: u32 = 600;

/// Speech backend for audio files.
pub struct AudioExtractor {
    transcriber: Arc<dyn Transcriber>,
    tools: ToolSettings,
    temp_root: PathBuf,
    max_upload_bytes: u64,
    chunk_seconds: u32,
}

impl AudioExtractor {
    pub fn new(transcriber: Arc<dyn Transcriber>, tools: ToolSettings, temp_root: PathBuf) -> Self {
        Self {
            transcriber,
            tools,
            temp_root,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            chunk_seconds: DEFAULT_CHUNK_SECONDS,
        }
    }

    /// Set the upload limit and the chunk length used above it.
    pub fn with_chunking(mut self, max_upload_bytes: u64, chunk_seconds: u32) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self.chunk_seconds = chunk_seconds;
        self
    }

    /// Create a scratch directory removed when the returned value drops.
    pub(crate) fn scratch_dir(temp_root: &Path) -> Result<tempfile::TempDir> {
        std::fs::create_dir_all(temp_root)?;
        Ok(tempfile::Builder::new().prefix("medley-").tempdir_in(temp_root)?)
    }

    async fn fits_upload(&self, path: &Path) -> Result<bool> {
        Ok(tokio::fs::metadata(path).await?.len() <= self.max_upload_bytes)
    }
}

/// Transcribe chunks in order and join the non-empty transcripts.
///
/// The first failing chunk fails the whole transcript.
async fn transcribe_chunks(transcriber: &dyn Transcriber, chunks: &[PathBuf]) -> Result<String> {
    let mut parts = Vec::with_capacity(chunks.len());

    for (idx, chunk) in chunks.iter().enumerate() {
        debug!("Transcribing chunk {}/{}", idx + 1, chunks.len());
        let text = transcriber.transcribe(chunk).await?;
        let text = text.trim();
        if !text.is_empty() {
            parts.push(text.to_string());
        }
    }

    Ok(parts.join(" "))
}

#[async_trait]
impl Extractor for AudioExtractor {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn extract(&self, path: &Path) -> Result<String> {
        if is_native_waveform(path) && self.fits_upload(path).await? {
            debug!("Input is already a waveform");
            return self.transcriber.transcribe(path).await;
        }

        let scratch = Self::scratch_dir(&self.temp_root)?;
        let wav_path = scratch.path().join("audio.wav");

        info!("Converting to 16 kHz mono waveform");
        to_waveform(path, &wav_path, &self.tools).await?;

        if self.fits_upload(&wav_path).await? {
            return self.transcriber.transcribe(&wav_path).await;
        }

        let chunk_dir = scratch.path().join("chunks");
        std::fs::create_dir_all(&chunk_dir)?;
        let chunks = split_waveform(&wav_path, &chunk_dir, self.chunk_seconds, &self.tools).await?;
        info!("Transcribing {} chunks", chunks.len());

        transcribe_chunks(self.transcriber.as_ref(), &chunks).await
    }

    fn name(&self) -> &str {
        "audio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MedleyError;
    use std::sync::Mutex;

    /// Records the paths it was asked to transcribe.
    struct RecordingTranscriber {
        calls: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl Transcriber for RecordingTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<String> {
            self.calls.lock().unwrap().push(audio_path.to_path_buf());
            Ok("hello world".to_string())
        }
    }

    #[tokio::test]
    async fn test_waveform_input_skips_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("note.wav");
        std::fs::write(&wav, b"RIFF").unwrap();

        let transcriber = Arc::new(RecordingTranscriber {
            calls: Mutex::new(Vec::new()),
        });
        let tools = ToolSettings {
            ffmpeg: Some("/nonexistent/ffmpeg".to_string()),
            ..Default::default()
        };
        let extractor = AudioExtractor::new(transcriber.clone(), tools, dir.path().join("tmp"));

        let text = extractor.extract(&wav).await.unwrap();
        assert_eq!(text, "hello world");
        assert_eq!(transcriber.calls.lock().unwrap().as_slice(), &[wav]);
    }

    #[tokio::test]
    async fn test_conversion_failure_aborts_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let mp3 = dir.path().join("note.mp3");
        std::fs::write(&mp3, b"ID3").unwrap();
        let temp_root = dir.path().join("tmp");

        let transcriber = Arc::new(RecordingTranscriber {
            calls: Mutex::new(Vec::new()),
        });
        let tools = ToolSettings {
            ffmpeg: Some("/nonexistent/ffmpeg".to_string()),
            ..Default::default()
        };
        let extractor = AudioExtractor::new(transcriber.clone(), tools, temp_root.clone());

        let err = extractor.extract(&mp3).await.unwrap_err();
        assert!(matches!(err, MedleyError::ConversionFailure(_)));
        assert!(transcriber.calls.lock().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(&temp_root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_waveform_is_not_uploaded_whole() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("lecture.wav");
        std::fs::write(&wav, b"RIFF....WAVE").unwrap();
        let temp_root = dir.path().join("tmp");

        let transcriber = Arc::new(RecordingTranscriber {
            calls: Mutex::new(Vec::new()),
        });
        let tools = ToolSettings {
            ffmpeg: Some("/nonexistent/ffmpeg".to_string()),
            ..Default::default()
        };
        let extractor = AudioExtractor::new(transcriber.clone(), tools, temp_root.clone())
            .with_chunking(4, 60);

        let err = extractor.extract(&wav).await.unwrap_err();
        assert!(matches!(err, MedleyError::ConversionFailure(_)));
        assert!(transcriber.calls.lock().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(&temp_root).unwrap().count(), 0);
    }

    /// Returns the chunk's file stem, or fails on a named chunk.
    struct StemTranscriber {
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl Transcriber for StemTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<String> {
            let stem = audio_path.file_stem().unwrap().to_string_lossy().to_string();
            if Some(stem.as_str()) == self.fail_on {
                return Err(MedleyError::RecognitionFailure(stem));
            }
            if stem == "silence" {
                return Ok("  ".to_string());
            }
            Ok(format!(" {} ", stem))
        }
    }

    #[tokio::test]
    async fn test_chunk_transcripts_join_in_order() {
        let chunks: Vec<PathBuf> = ["first", "silence", "second", "third"]
            .iter()
            .map(|n| PathBuf::from(format!("/scratch/{}.wav", n)))
            .collect();

        let text = transcribe_chunks(&StemTranscriber { fail_on: None }, &chunks)
            .await
            .unwrap();
        assert_eq!(text, "first second third");

        let err = transcribe_chunks(&StemTranscriber { fail_on: Some("second") }, &chunks)
            .await
            .unwrap_err();
        assert!(matches!(err, MedleyError::RecognitionFailure(_)));
    }
}
