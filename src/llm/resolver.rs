//! Startup model resolution by live probing.

use super::{ModelClient, ModelHandle};
use crate::config::ModelSettings;
use crate::error::MedleyError;
use tracing::{debug, info, instrument, warn};

/// Prompt sent to each probe candidate.
const PROBE_PROMPT: &str = "ping";

/// Catalog id fragments naming models that cannot answer a chat prompt.
const NON_CHAT_MARKERS: &[&str] = &[
    "audio", "realtime", "transcribe", "tts", "whisper", "image", "dall-e", "embed", "rerank",
    "search", "moderation", "babbage", "davinci",
];

/// Picks the first model that answers a probe.
#[derive(Debug, Clone)]
pub struct ModelResolver {
    candidates: Vec<String>,
    default_model: String,
}

impl ModelResolver {
    pub fn new(candidates: Vec<String>, default_model: impl Into<String>) -> Self {
        Self {
            candidates,
            default_model: default_model.into(),
        }
    }

    pub fn from_settings(settings: &ModelSettings) -> Self {
        Self::new(settings.candidates.clone(), settings.default_model.clone())
    }

    /// Ordered probe list: each candidate bare then prefixed, then any
    /// catalog ids not already listed.
    pub fn probe_list(&self, catalog: &[String]) -> Vec<String> {
        let mut list: Vec<String> = Vec::new();

        for name in &self.candidates {
            list.push(name.clone());
            list.push(format!("models/{}", name));
        }

        for id in catalog {
            if is_chat_model(id) && !list.contains(id) {
                list.push(id.clone());
            }
        }

        list
    }

    /// Probe candidates in order. Falls back to the configured default
    /// when none answers.
    #[instrument(skip_all)]
    pub async fn resolve(&self, client: &dyn ModelClient) -> ModelHandle {
        let catalog = match client.list_models().await {
            Ok(ids) => ids,
            Err(e) => {
                debug!("Model catalog unavailable: {}", e);
                Vec::new()
            }
        };

        for name in self.probe_list(&catalog) {
            match client.generate(&name, PROBE_PROMPT).await {
                Ok(_) => {
                    info!("Using model {}", name);
                    return ModelHandle::new(name);
                }
                Err(e) => debug!("Probe of {} failed: {}", name, e),
            }
        }

        let err = MedleyError::ModelUnavailable(format!(
            "no candidate answered; using {}",
            self.default_model
        ));
        warn!("{}", err);
        ModelHandle::new(self.default_model.clone())
    }
}

/// Any catalog id is a chat candidate unless it names a non-chat capability.
fn is_chat_model(id: &str) -> bool {
    let id = id.strip_prefix("models/").unwrap_or(id).to_ascii_lowercase();
    !id.is_empty() && !NON_CHAT_MARKERS.iter().any(|m| id.contains(m))
}
