use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::LlmError;
use crate::providers::stream::{for_each_line, sse_data, FragmentSink};
use crate::providers::{error_from_response, http_client, FragmentCallback, LlmClient};

/// Anthropic client for interacting with Anthropic API
pub struct Anthropic {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL (empty means the public API)
    endpoint: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: u32,
    system_prompt: Option<String>,
}

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<AnthropicMessage>,

    /// System prompt to guide the AI
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    max_tokens: u32,

    stream: bool,
}

/// Anthropic message format
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role of the message sender (user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// One streamed event payload
#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<EventDelta>,
    #[serde(default)]
    error: Option<EventError>,
}

#[derive(Debug, Deserialize)]
struct EventDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventError {
    #[serde(rename = "type", default)]
    error_type: String,
    #[serde(default)]
    message: String,
}

impl AnthropicRequest {
    /// Create a new streaming Anthropic request
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
            stream: true,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AnthropicMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: Option<String>) -> Self {
        self.system = system;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

impl Anthropic {
    /// Create a new Anthropic client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            temperature: None,
            max_tokens: 4096,
            system_prompt: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        self.system_prompt = if system_prompt.is_empty() { None } else { Some(system_prompt) };
        self
    }

    /// Full URL of the messages resource
    pub fn messages_url(&self) -> String {
        if self.endpoint.is_empty() {
            "https://api.anthropic.com/v1/messages".to_string()
        } else {
            format!("{}/v1/messages", self.endpoint.trim_end_matches('/'))
        }
    }

    /// Build the request body for `prompt`
    pub fn build_request(&self, prompt: &str) -> AnthropicRequest {
        AnthropicRequest::new(self.model.clone(), self.max_tokens)
            .system(self.system_prompt.clone())
            .temperature(self.temperature)
            .add_message("user", prompt)
    }
}

/// Handle one SSE line; returns false once the message is complete
pub(crate) fn handle_event_line(line: &str, sink: &mut FragmentSink) -> Result<bool, LlmError> {
    let Some(data) = sse_data(line) else {
        return Ok(true);
    };

    let event = match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => event,
        Err(e) => {
            debug!("Skipping undecodable Anthropic event: {} ({})", data, e);
            return Ok(true);
        }
    };

    match event.event_type.as_str() {
        "content_block_delta" => {
            if let Some(text) = event.delta.and_then(|d| d.text) {
                sink.push(&text);
            }
            Ok(true)
        }
        "message_stop" => Ok(false),
        "error" => {
            let error = event.error.unwrap_or(EventError {
                error_type: String::new(),
                message: "unknown stream error".to_string(),
            });
            error!("Anthropic stream error ({}): {}", error.error_type, error.message);
            Err(match error.error_type.as_str() {
                "overloaded_error" | "api_error" => LlmError::Transport(error.message),
                "rate_limit_error" => LlmError::RateLimited(error.message),
                "authentication_error" | "permission_error" => LlmError::AuthRejected(error.message),
                _ => LlmError::InvalidResponse(error.message),
            })
        }
        _ => Ok(true),
    }
}

#[async_trait]
impl LlmClient for Anthropic {
    async fn complete(&self, prompt: &str, on_fragment: Option<FragmentCallback>) -> Result<String, LlmError> {
        let request = self.build_request(prompt);

        let response = self.client.post(self.messages_url())
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response("Anthropic", response).await);
        }

        let mut sink = FragmentSink::new(on_fragment);
        for_each_line(Box::pin(response.bytes_stream()), |line| handle_event_line(line, &mut sink)).await?;
        Ok(sink.into_text())
    }

    fn name(&self) -> &str {
        "Anthropic"
    }
}
