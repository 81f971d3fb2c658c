//! Video extraction: pull the audio track, then reuse the audio backend.

use super::{AudioExtractor, Extractor};
use crate::audio::to_waveform;
use crate::config::ToolSettings;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// Speech backend for video files.
pub struct VideoExtractor {
    audio: Arc<AudioExtractor>,
    tools: ToolSettings,
    temp_root: PathBuf,
}

impl VideoExtractor {
    pub fn new(audio: Arc<AudioExtractor>, tools: ToolSettings, temp_root: PathBuf) -> Self {
        Self {
            audio,
            tools,
            temp_root,
        }
    }
}

#[async_trait]
impl Extractor for VideoExtractor {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn extract(&self, path: &Path) -> Result<String> {
        // Dropped on every return path, which removes the extracted track
        let scratch = AudioExtractor::scratch_dir(&self.temp_root)?;
        let track = scratch.path().join("track.wav");

        info!("Extracting audio track");
        to_waveform(path, &track, &self.tools).await?;

        self.audio.extract(&track).await
    }

    fn name(&self) -> &str {
        "video"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MedleyError;
    use crate::transcription::Transcriber;

    struct NeverCalled;

    #[async_trait]
    impl Transcriber for NeverCalled {
        async fn transcribe(&self, _audio_path: &Path) -> Result<String> {
            panic!("transcriber must not run when track extraction fails");
        }
    }

    #[tokio::test]
    async fn test_failed_track_extraction_leaves_no_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"\x00\x00\x00\x18ftypmp42").unwrap();
        let temp_root = dir.path().join("tmp");

        let tools = ToolSettings {
            ffmpeg: Some("/nonexistent/ffmpeg".to_string()),
            ..Default::default()
        };
        let audio = Arc::new(AudioExtractor::new(
            Arc::new(NeverCalled),
            tools.clone(),
            temp_root.clone(),
        ));
        let extractor = VideoExtractor::new(audio, tools, temp_root.clone());

        let err = extractor.extract(&video).await.unwrap_err();
        assert!(matches!(err, MedleyError::ConversionFailure(_)));
        assert_eq!(std::fs::read_dir(&temp_root).unwrap().count(), 0);
    }
}
