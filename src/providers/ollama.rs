use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::LlmError;
use crate::providers::stream::{for_each_line, FragmentSink};
use crate::providers::{error_from_response, http_client, FragmentCallback, LlmClient};

/// Ollama client for a local or remote Ollama server
pub struct Ollama {
    /// Base URL such as `http://localhost:11434`
    base_url: String,
    /// HTTP client for API requests
    client: Client,
    model: String,
    temperature: Option<f32>,
    system_prompt: Option<String>,
}

/// Request for text generation
#[derive(Debug, Serialize)]
pub struct GenerationRequest {
    /// Model name
    model: String,

    /// Prompt to generate from
    prompt: String,

    /// System prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    /// Generation options
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,

    /// Whether to stream the response
    stream: bool,
}

/// Sampling options
#[derive(Debug, Serialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// One NDJSON line of a streamed generation
#[derive(Debug, Deserialize)]
struct GenerationChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl GenerationRequest {
    /// Create a new streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: true,
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: Option<String>) -> Self {
        self.system = system;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.options = temperature.map(|t| GenerationOptions { temperature: Some(t) });
        self
    }
}

impl Ollama {
    /// Create a new Ollama client. Endpoints without a scheme get `http://`.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Self {
        let endpoint = endpoint.into();
        let base_url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint
        } else {
            format!("http://{}", endpoint)
        };

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout_secs),
            model: model.into(),
            temperature: None,
            system_prompt: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        self.system_prompt = if system_prompt.is_empty() { None } else { Some(system_prompt) };
        self
    }

    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    pub fn build_request(&self, prompt: &str) -> GenerationRequest {
        GenerationRequest::new(self.model.clone(), prompt)
            .system(self.system_prompt.clone())
            .temperature(self.temperature)
    }
}

/// Handle one NDJSON line; returns false after the final chunk
pub(crate) fn handle_ndjson_line(line: &str, sink: &mut FragmentSink) -> Result<bool, LlmError> {
    let chunk = match serde_json::from_str::<GenerationChunk>(line) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!("Skipping undecodable Ollama line: {} ({})", line, e);
            return Ok(true);
        }
    };

    if let Some(error) = chunk.error {
        return Err(LlmError::InvalidResponse(error));
    }
    sink.push(&chunk.response);
    Ok(!chunk.done)
}

#[async_trait]
impl LlmClient for Ollama {
    async fn complete(&self, prompt: &str, on_fragment: Option<FragmentCallback>) -> Result<String, LlmError> {
        let request = self.build_request(prompt);

        let response = self.client.post(self.generate_url())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response("Ollama", response).await);
        }

        let mut sink = FragmentSink::new(on_fragment);
        for_each_line(Box::pin(response.bytes_stream()), |line| handle_ndjson_line(line, &mut sink)).await?;
        Ok(sink.into_text())
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}
