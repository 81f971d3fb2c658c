//! [`ModelClient`] for OpenAI-compatible chat completion APIs.

use super::{ImageInput, ModelClient};
use crate::config::Settings;
use crate::error::{MedleyError, Result};
use crate::openai::create_client;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Chat-completions client.
pub struct OpenAiModelClient {
    client: Client<OpenAIConfig>,
    has_key: bool,
}

impl OpenAiModelClient {
    /// Wrap a client whose configuration already carries an API key.
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self {
            client,
            has_key: true,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: create_client(settings)?,
            has_key: settings.api_key().is_some(),
        })
    }

    async fn complete(&self, request: CreateChatCompletionRequest) -> Result<String> {
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| MedleyError::OpenAI(e.to_string()))?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(text)
    }
}

#[async_trait]
impl ModelClient for OpenAiModelClient {
    async fn list_models(&self) -> Result<Vec<String>> {
        let models = self
            .client
            .models()
            .list()
            .await
            .map_err(|e| MedleyError::OpenAI(format!("Failed to list models: {}", e)))?;

        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    #[instrument(skip(self, prompt), fields(prompt_chars = prompt.len()))]
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let message: ChatCompletionRequestMessage = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| MedleyError::OpenAI(e.to_string()))?
            .into();

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![message])
            .build()
            .map_err(|e| MedleyError::OpenAI(e.to_string()))?;

        self.complete(request).await
    }

    #[instrument(skip(self, prompt, image), fields(mime = %image.mime_type))]
    async fn generate_with_image(
        &self,
        model: &str,
        prompt: &str,
        image: &ImageInput,
    ) -> Result<String> {
        let image_part = ChatCompletionRequestMessageContentPartImage {
            image_url: ImageUrl {
                url: image.data_url(),
                detail: Some(ImageDetail::Auto),
            },
        };

        let request = CreateChatCompletionRequest {
            model: model.to_string(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Array(vec![
                        ChatCompletionRequestUserMessageContentPart::ImageUrl(image_part),
                        ChatCompletionRequestUserMessageContentPart::Text(prompt.to_string().into()),
                    ]),
                    name: None,
                },
            )],
            ..Default::default()
        };

        debug!("Sending {} image bytes", image.data.len());
        self.complete(request).await
    }

    fn has_credentials(&self) -> bool {
        self.has_key
    }
}
