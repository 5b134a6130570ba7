/*!
 * LLM provider clients.
 *
 * The rewrite stage only needs "send a prompt, get text back, optionally
 * watch it arrive". This module defines that capability and ships clients
 * for the services the engine supports:
 * - OpenAI-compatible chat completions (OpenAI, DeepSeek, SiliconFlow, LM Studio)
 * - Anthropic messages API
 * - Ollama local server
 */

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{LlmConfig, LlmProvider};
use crate::errors::LlmError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod stream;

/// Receives streamed text fragments as they arrive
pub type FragmentCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Common trait for all LLM providers
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `prompt` and return the accumulated response text.
    ///
    /// When `on_fragment` is given, each streamed piece is delivered to it
    /// before the full text is returned.
    async fn complete(&self, prompt: &str, on_fragment: Option<FragmentCallback>) -> Result<String, LlmError>;

    /// Short name used in log lines
    fn name(&self) -> &str;
}

/// Build an HTTP client with the given request timeout
pub(crate) fn http_client(timeout_secs: u64) -> Client {
    match Client::builder().timeout(Duration::from_secs(timeout_secs)).build() {
        Ok(client) => client,
        Err(e) => {
            log::warn!("Failed to build HTTP client with a {}s timeout, using defaults without timeout: {}", timeout_secs, e);
            Client::default()
        }
    }
}

/// Turn a non-success response into an error, consuming its body
pub(crate) async fn error_from_response(provider: &str, response: reqwest::Response) -> LlmError {
    let status = response.status();
    let error_text = response.text().await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    log::error!("{} API error ({}): {}", provider, status, error_text);
    LlmError::from_status(status.as_u16(), error_text)
}

/// Create the client for the configured provider
pub fn create_client(config: &LlmConfig) -> Arc<dyn LlmClient> {
    let endpoint = config.get_endpoint();
    let model = config.get_model();
    let api_key = config.get_api_key();
    let timeout_secs = config.get_timeout_secs();
    let common = &config.common;

    match config.provider {
        LlmProvider::Anthropic => Arc::new(
            anthropic::Anthropic::new(api_key, endpoint, model, timeout_secs)
                .temperature(common.temperature)
                .max_tokens(config.get_max_tokens())
                .system_prompt(common.system_prompt.clone()),
        ),
        LlmProvider::Ollama => Arc::new(
            ollama::Ollama::new(endpoint, model, timeout_secs)
                .temperature(common.temperature)
                .system_prompt(common.system_prompt.clone()),
        ),
        LlmProvider::OpenAI | LlmProvider::LMStudio | LlmProvider::DeepSeek | LlmProvider::SiliconFlow => Arc::new(
            openai::OpenAiCompatible::new(config.provider.display_name(), api_key, endpoint, model, timeout_secs)
                .temperature(common.temperature)
                .max_tokens(config.get_max_tokens())
                .system_prompt(common.system_prompt.clone()),
        ),
    }
}
