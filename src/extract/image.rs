//! Image OCR through the Tesseract command-line engine.

use super::Extractor;
use crate::error::{MedleyError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Runs Tesseract over the full image and returns its raw output.
pub struct ImageExtractor {
    tesseract: String,
}

impl ImageExtractor {
    /// Create an extractor using the given Tesseract executable.
    pub fn new(tesseract: impl Into<String>) -> Self {
        Self {
            tesseract: tesseract.into(),
        }
    }
}

#[async_trait]
impl Extractor for ImageExtractor {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn extract(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(MedleyError::RecognitionFailure(format!(
                "Image not found: {}",
                path.display()
            )));
        }

        let result = Command::new(&self.tesseract)
            .arg(path)
            .arg("stdout")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MedleyError::RecognitionFailure(format!(
                    "tesseract not found at '{}'. Install it or set TESSERACT_CMD.",
                    self.tesseract
                )));
            }
            Err(e) => {
                return Err(MedleyError::RecognitionFailure(format!("tesseract error: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MedleyError::RecognitionFailure(format!(
                "tesseract failed: {}",
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("OCR produced {} characters", text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        "image"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_engine_is_recognition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("scan.png");
        std::fs::write(&image, [0x89, 0x50, 0x4E, 0x47]).unwrap();

        let extractor = ImageExtractor::new("/nonexistent/tesseract");
        let err = extractor.extract(&image).await.unwrap_err();
        assert!(matches!(err, MedleyError::RecognitionFailure(_)));
    }

    #[tokio::test]
    async fn test_missing_image_is_recognition_failure() {
        let extractor = ImageExtractor::new("tesseract");
        let err = extractor
            .extract(Path::new("/nonexistent/scan.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, MedleyError::RecognitionFailure(_)));
    }
}
