//! OpenAI-compatible client configuration with sensible defaults.

use crate::config::Settings;
use crate::error::{MedleyError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create a client from the model settings (API key, base URL, timeout).
pub fn create_client(settings: &Settings) -> Result<Client<OpenAIConfig>> {
    let timeout = match settings.model.timeout_seconds {
        0 => DEFAULT_TIMEOUT_SECS,
        secs => secs,
    };

    let mut config = OpenAIConfig::default();
    if let Some(key) = settings.api_key() {
        config = config.with_api_key(key);
    }
    if let Some(base) = settings.model.api_base.as_deref().filter(|b| !b.is_empty()) {
        config = config.with_api_base(base);
    }

    create_client_with_timeout(config, Duration::from_secs(timeout))
}

/// Create a client with a custom configuration and timeout.
pub fn create_client_with_timeout(
    config: OpenAIConfig,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Client::with_config(config).with_http_client(http_client))
}
