//! Generative model access: model resolution and question answering.

mod answer;
mod openai;
mod resolver;

pub use answer::{
    truncate_chars, AnsweringService, IMAGE_ANSWER_UNAVAILABLE, LLM_ERROR_PREFIX,
};
pub use openai::OpenAiModelClient;
pub use resolver::ModelResolver;

use crate::error::{MedleyError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::Path;

/// A resolved model identifier, fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle(String);

impl ModelHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Image bytes sent alongside a prompt.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageInput {
    /// Load an image file; the MIME type is taken from its extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let mime_type = match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => {
                return Err(MedleyError::UnsupportedFormat(format!(
                    "Not an image: {}",
                    path.display()
                )))
            }
        };

        let data = tokio::fs::read(path).await?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    /// Base64 `data:` URL for inline transmission.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

/// Generative model service boundary.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model ids the service advertises.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Single-turn text generation.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;

    /// Single-turn generation with an attached image.
    async fn generate_with_image(
        &self,
        model: &str,
        prompt: &str,
        image: &ImageInput,
    ) -> Result<String>;

    /// Whether requests carry credentials the service can accept.
    fn has_credentials(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_image_input_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.JPG");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let image = ImageInput::from_path(&path).await.unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data_url(), "data:image/jpeg;base64,AQID");
    }

    #[tokio::test]
    async fn test_image_input_rejects_other_files() {
        let err = ImageInput::from_path(Path::new("notes.txt")).await.unwrap_err();
        assert!(matches!(err, MedleyError::UnsupportedFormat(_)));
    }
}
