//! Format dispatch: classifies a reference into a content kind.

use crate::error::{MedleyError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of an ingested source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Pdf,
    Docx,
    Pptx,
    Text,
    Image,
    Audio,
    Video,
    Youtube,
}

impl ContentKind {
    pub const ALL: [ContentKind; 8] = [
        ContentKind::Pdf,
        ContentKind::Docx,
        ContentKind::Pptx,
        ContentKind::Text,
        ContentKind::Image,
        ContentKind::Audio,
        ContentKind::Video,
        ContentKind::Youtube,
    ];

    /// Lowercase tag used for storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Pdf => "pdf",
            ContentKind::Docx => "docx",
            ContentKind::Pptx => "pptx",
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Audio => "audio",
            ContentKind::Video => "video",
            ContentKind::Youtube => "youtube",
        }
    }

    /// Whether this kind is produced by a media backend (OCR or speech).
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            ContentKind::Image | ContentKind::Audio | ContentKind::Video
        )
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ContentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown content kind: {}", s))
    }
}

/// File extensions accepted for upload, in display order.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "pptx", "txt", "md", "png", "jpg", "jpeg", "mp3", "wav", "m4a", "mp4",
];

/// Host markers identifying a video-sharing URL.
const YOUTUBE_HOST_MARKERS: &[&str] = &["youtube", "youtu.be"];

/// Classify a file path or URL.
///
/// Fails with `UnsupportedFormat` when the reference is neither a video-sharing
/// URL nor a file with a known extension.
pub fn classify(reference: &str) -> Result<ContentKind> {
    if is_youtube_url(reference) {
        return Ok(ContentKind::Youtube);
    }

    let ext = Path::new(reference)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| {
            MedleyError::UnsupportedFormat(format!("No file extension: {}", reference))
        })?;

    kind_for_extension(&ext).ok_or_else(|| {
        MedleyError::UnsupportedFormat(format!(
            ".{} ({}); supported: {}",
            ext,
            reference,
            SUPPORTED_EXTENSIONS.join(", ")
        ))
    })
}

/// Map a lowercase extension to its content kind.
pub fn kind_for_extension(ext: &str) -> Option<ContentKind> {
    let kind = match ext {
        "pdf" => ContentKind::Pdf,
        "docx" => ContentKind::Docx,
        "pptx" => ContentKind::Pptx,
        "txt" | "md" => ContentKind::Text,
        "png" | "jpg" | "jpeg" => ContentKind::Image,
        "mp3" | "wav" | "m4a" => ContentKind::Audio,
        "mp4" => ContentKind::Video,
        _ => return None,
    };
    Some(kind)
}

fn is_youtube_url(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && YOUTUBE_HOST_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_table() {
        let cases = [
            ("report.pdf", ContentKind::Pdf),
            ("letter.docx", ContentKind::Docx),
            ("deck.pptx", ContentKind::Pptx),
            ("notes.txt", ContentKind::Text),
            ("README.md", ContentKind::Text),
            ("scan.png", ContentKind::Image),
            ("photo.jpg", ContentKind::Image),
            ("photo.JPEG", ContentKind::Image),
            ("talk.mp3", ContentKind::Audio),
            ("/tmp/voice.wav", ContentKind::Audio),
            ("memo.m4a", ContentKind::Audio),
            ("clip.mp4", ContentKind::Video),
        ];

        for (reference, expected) in cases {
            assert_eq!(classify(reference).unwrap(), expected, "{}", reference);
        }
    }

    #[test]
    fn test_unsupported_extensions() {
        for reference in ["archive.zip", "movie.mkv", "sheet.xlsx", "Makefile", "noext", ""] {
            let err = classify(reference).unwrap_err();
            assert!(
                matches!(err, MedleyError::UnsupportedFormat(_)),
                "{} -> {:?}",
                reference,
                err
            );
        }
    }

    #[test]
    fn test_supported_extensions_match_table() {
        for ext in SUPPORTED_EXTENSIONS {
            assert!(kind_for_extension(ext).is_some(), "{}", ext);
        }

        let err = classify("sheet.xlsx").unwrap_err().to_string();
        assert!(err.contains("supported: pdf, docx, pptx"), "{}", err);
    }

    #[test]
    fn test_youtube_urls() {
        assert_eq!(
            classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            ContentKind::Youtube
        );
        assert_eq!(
            classify("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            ContentKind::Youtube
        );
        assert_eq!(
            classify("http://youtube.com/shorts/abcdefghijk").unwrap(),
            ContentKind::Youtube
        );
        // Needs a web scheme
        assert!(classify("youtube.com/watch?v=dQw4w9WgXcQ").is_err());
        // Other hosts fall through to extension matching
        assert_eq!(
            classify("https://example.com/files/paper.pdf").unwrap(),
            ContentKind::Pdf
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        for reference in ["a.pdf", "https://youtu.be/xyz123", "b.mp4"] {
            assert_eq!(classify(reference).unwrap(), classify(reference).unwrap());
        }
    }

    #[test]
    fn test_kind_roundtrip_through_str() {
        for kind in ContentKind::ALL {
            assert_eq!(kind.as_str().parse::<ContentKind>().unwrap(), kind);
        }
    }
}
