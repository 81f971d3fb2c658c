//! Extraction backends: turn a local file into plain text.
//!
//! One backend per content kind. Video-sharing URLs are handled separately by
//! [`crate::youtube`], which reuses the audio backend.

mod audio;
mod document;
mod image;
mod text;
mod video;

pub use audio::AudioExtractor;
pub use document::{DocxExtractor, PdfExtractor, PptxExtractor};
pub use image::ImageExtractor;
pub use text::{decode_text, TextEncoding, TextExtractor, TEXT_ENCODINGS};
pub use video::VideoExtractor;

use crate::config::Settings;
use crate::dispatch::ContentKind;
use crate::error::Result;
use crate::transcription::Transcriber;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Core extractor trait: path in, text out.
///
/// An empty string is a valid result. Backends never touch the content store.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract the text content of a local file.
    async fn extract(&self, path: &Path) -> Result<String>;

    /// Human-readable name for this extractor.
    fn name(&self) -> &str;
}

/// The full set of file backends, indexed by content kind.
pub struct ExtractorSet {
    pdf: PdfExtractor,
    docx: DocxExtractor,
    pptx: PptxExtractor,
    text: TextExtractor,
    image: ImageExtractor,
    audio: Arc<AudioExtractor>,
    video: VideoExtractor,
}

impl ExtractorSet {
    /// Build all backends from settings and a speech recognizer.
    pub fn new(settings: &Settings, transcriber: Arc<dyn Transcriber>) -> Self {
        let audio = Arc::new(
            AudioExtractor::new(transcriber, settings.tools.clone(), settings.temp_dir())
                .with_chunking(
                    settings.transcription.max_upload_bytes,
                    settings.transcription.chunk_seconds,
                ),
        );

        Self {
            pdf: PdfExtractor,
            docx: DocxExtractor,
            pptx: PptxExtractor,
            text: TextExtractor,
            image: ImageExtractor::new(settings.tools.tesseract()),
            video: VideoExtractor::new(audio.clone(), settings.tools.clone(), settings.temp_dir()),
            audio,
        }
    }

    /// Backend for a file kind. `Youtube` has no file backend.
    pub fn for_kind(&self, kind: ContentKind) -> Option<&dyn Extractor> {
        match kind {
            ContentKind::Pdf => Some(&self.pdf),
            ContentKind::Docx => Some(&self.docx),
            ContentKind::Pptx => Some(&self.pptx),
            ContentKind::Text => Some(&self.text),
            ContentKind::Image => Some(&self.image),
            ContentKind::Audio => Some(self.audio.as_ref()),
            ContentKind::Video => Some(&self.video),
            ContentKind::Youtube => None,
        }
    }

    /// Shared handle to the audio backend.
    pub fn audio(&self) -> Arc<AudioExtractor> {
        self.audio.clone()
    }

    /// The OCR backend (used for image question hints).
    pub fn image(&self) -> &ImageExtractor {
        &self.image
    }
}
