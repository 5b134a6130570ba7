use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::LlmError;
use crate::providers::stream::{for_each_line, sse_data, FragmentSink};
use crate::providers::{error_from_response, http_client, FragmentCallback, LlmClient};

/// Client for OpenAI-compatible chat completion endpoints
pub struct OpenAiCompatible {
    /// Display name of the service behind the endpoint
    name: String,
    /// HTTP client for API requests
    client: Client,
    /// API key, empty for local servers
    api_key: String,
    /// Base URL such as `https://api.openai.com/v1`
    endpoint: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    system_prompt: Option<String>,
}

/// Streaming chat completion request
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<ChatMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,

    stream: bool,
}

/// Chat message format
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// One `data:` payload of the completion stream
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl ChatRequest {
    /// Create a new streaming request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            stream: true,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the completion token limit
    pub fn max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl OpenAiCompatible {
    /// Create a new client
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            name: name.into(),
            client: http_client(timeout_secs),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            system_prompt: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        self.system_prompt = if system_prompt.is_empty() { None } else { Some(system_prompt) };
        self
    }

    /// Full URL of the chat completions resource
    pub fn completions_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}/chat/completions", base)
        }
    }

    /// Build the request body for `prompt`
    pub fn build_request(&self, prompt: &str) -> ChatRequest {
        let mut request = ChatRequest::new(self.model.clone());
        if let Some(system) = &self.system_prompt {
            request = request.add_message("system", system.clone());
        }
        request
            .add_message("user", prompt)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
    }
}

/// Handle one SSE line; returns false once the stream is finished
pub(crate) fn handle_sse_line(line: &str, sink: &mut FragmentSink) -> Result<bool, LlmError> {
    let Some(data) = sse_data(line) else {
        return Ok(true);
    };
    if data == "[DONE]" {
        return Ok(false);
    }

    match serde_json::from_str::<ChatChunk>(data) {
        Ok(chunk) => {
            for choice in chunk.choices {
                if let Some(content) = choice.delta.content {
                    sink.push(&content);
                }
            }
        }
        Err(e) => debug!("Skipping undecodable stream line: {} ({})", data, e),
    }
    Ok(true)
}

#[async_trait]
impl LlmClient for OpenAiCompatible {
    async fn complete(&self, prompt: &str, on_fragment: Option<FragmentCallback>) -> Result<String, LlmError> {
        let request = self.build_request(prompt);

        let mut builder = self.client.post(self.completions_url())
            .header("Content-Type", "application/json")
            .json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response).await);
        }

        let mut sink = FragmentSink::new(on_fragment);
        for_each_line(Box::pin(response.bytes_stream()), |line| handle_sse_line(line, &mut sink)).await?;
        Ok(sink.into_text())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
