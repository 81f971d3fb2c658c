//! Speech-to-text for the audio and video backends.

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for speech recognition services.
///
/// Implementations receive a waveform file and return the plain transcript.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a waveform file into plain text.
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}
