//! Context assembly and answer generation.

use super::{ImageInput, ModelClient, ModelHandle};
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Prefix of every error answer.
pub const LLM_ERROR_PREFIX: &str = "LLM error: ";

/// Returned when the image call fails and no OCR hint is available.
pub const IMAGE_ANSWER_UNAVAILABLE: &str =
    "LLM error: image question answering is unavailable. Try providing an OCR hint.";

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Answers questions with the resolved model. Never returns an error; failures
/// come back as answer text starting with [`LLM_ERROR_PREFIX`].
pub struct AnsweringService {
    client: Arc<dyn ModelClient>,
    model: ModelHandle,
    max_context_chars: usize,
}

impl AnsweringService {
    pub fn new(client: Arc<dyn ModelClient>, model: ModelHandle, max_context_chars: usize) -> Self {
        Self {
            client,
            model,
            max_context_chars,
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Render the prompt for a question and optional context.
    pub fn build_prompt(&self, question: &str, context: Option<&str>) -> String {
        match context.filter(|c| !c.is_empty()) {
            Some(context) => {
                let context = truncate_chars(context, self.max_context_chars);
                format!("Context:\n{}\n\nQuestion: {}", context, question)
            }
            None => question.to_string(),
        }
    }

    /// Answer a question, optionally grounded in context.
    #[instrument(skip(self, context), fields(model = %self.model))]
    pub async fn answer(&self, question: &str, context: Option<&str>) -> String {
        match self.try_answer(question, context).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Answer failed: {}", e);
                format!("{}{}", LLM_ERROR_PREFIX, e)
            }
        }
    }

    async fn try_answer(&self, question: &str, context: Option<&str>) -> Result<String> {
        let prompt = self.build_prompt(question, context);
        debug!("Prompt is {} characters", prompt.chars().count());

        let text = self.client.generate(self.model.as_str(), &prompt).await?;
        Ok(text.trim().to_string())
    }

    /// Answer a question about an image.
    ///
    /// Tries the multimodal call first, then a text answer using the OCR hint
    /// as context.
    #[instrument(skip(self, ocr_hint), fields(model = %self.model, path = %path.display()))]
    pub async fn answer_about_image(
        &self,
        path: &Path,
        question: &str,
        ocr_hint: Option<&str>,
    ) -> String {
        let hint = ocr_hint.filter(|h| !h.trim().is_empty());

        let prompt = match hint {
            Some(hint) => format!("OCR/context:\n{}\n\nQuestion: {}", hint, question),
            None => question.to_string(),
        };

        match self.try_image_answer(path, &prompt).await {
            Ok(text) => return text,
            Err(e) => warn!("Image answer failed: {}", e),
        }

        match hint {
            Some(hint) => self.answer(question, Some(hint)).await,
            None => IMAGE_ANSWER_UNAVAILABLE.to_string(),
        }
    }

    async fn try_image_answer(&self, path: &Path, prompt: &str) -> Result<String> {
        let image = ImageInput::from_path(path).await?;
        let text = self
            .client
            .generate_with_image(self.model.as_str(), prompt, &image)
            .await?;
        Ok(text.trim().to_string())
    }
}
