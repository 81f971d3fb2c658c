//! Plain-text and Markdown extraction with encoding fallback.

use super::Extractor;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, warn};

/// Text encodings attempted in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8, with a leading byte-order mark removed.
    Utf8,
    /// Windows code page 1252.
    Windows1252,
    /// ISO-8859-1.
    Latin1,
}

/// Fixed decode order for text files.
pub const TEXT_ENCODINGS: &[TextEncoding] = &[
    TextEncoding::Utf8,
    TextEncoding::Windows1252,
    TextEncoding::Latin1,
];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Code points for bytes 0x80..=0x9F in Windows-1252. `None` marks bytes the
/// code page leaves undefined.
const WINDOWS_1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

impl TextEncoding {
    /// Strict decode; `None` when the bytes are invalid in this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => {
                let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(str::to_string)
            }
            TextEncoding::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => WINDOWS_1252_HIGH[(b - 0x80) as usize],
                    _ => Some(b as char),
                })
                .collect(),
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Decode bytes with the first encoding that accepts them.
///
/// Falls back to lossy UTF-8, so this never fails.
pub fn decode_text(bytes: &[u8]) -> String {
    for encoding in TEXT_ENCODINGS {
        if let Some(text) = encoding.decode(bytes) {
            debug!("Decoded {} bytes as {:?}", bytes.len(), encoding);
            return text;
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// Extractor for `.txt` and `.md` files.
pub struct TextExtractor;

#[async_trait]
impl Extractor for TextExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(decode_text(&bytes)),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                Ok(String::new())
            }
        }
    }

    fn name(&self) -> &str {
        "text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_and_bom() {
        assert_eq!(decode_text("héllo".as_bytes()), "héllo");

        let mut with_bom = UTF8_BOM.to_vec();
        with_bom.extend_from_slice(b"plain");
        assert_eq!(decode_text(&with_bom), "plain");
    }

    #[test]
    fn test_windows_1252_fallback() {
        // 0x93/0x94 are curly quotes in cp1252 and invalid UTF-8
        let bytes = [0x93, b'h', b'i', 0x94, b' ', 0x80];
        assert_eq!(decode_text(&bytes), "\u{201C}hi\u{201D} \u{20AC}");
    }

    #[test]
    fn test_latin1_fallback_for_undefined_cp1252_bytes() {
        // 0x81 is undefined in cp1252 but maps to U+0081 in Latin-1
        let bytes = [b'a', 0x81, b'b'];
        assert_eq!(TextEncoding::Windows1252.decode(&bytes), None);
        assert_eq!(decode_text(&bytes), "a\u{81}b");
    }

    #[tokio::test]
    async fn test_invalid_bytes_still_produce_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.txt");
        std::fs::write(&path, [0xFF, 0xFE, 0x00, 0xC3, 0x28, b'o', b'k']).unwrap();

        let text = TextExtractor.extract(&path).await.unwrap();
        assert!(text.ends_with("ok"));
    }

    #[tokio::test]
    async fn test_missing_file_yields_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let text = TextExtractor
            .extract(&dir.path().join("gone.md"))
            .await
            .unwrap();
        assert!(text.is_empty());
    }
}
