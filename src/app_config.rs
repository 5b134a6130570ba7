use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::cache::KeyPolicy;
use crate::segmentation::aligner::AlignmentConfig;
use crate::segmentation::fallback::FallbackConfig;
use crate::segmentation::timestamps::TimestampConfig;

/// Engine configuration module
/// This module handles the engine configuration including loading,
/// validating and saving configuration settings.
/// Represents the engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language hint passed to prompts ("auto" lets the recognizer decide)
    #[serde(default = "default_language")]
    pub language: String,

    /// LLM rewriting config
    #[serde(default)]
    pub llm: LlmConfig,

    /// Chunking and segment sizing
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Aligner thresholds
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Timestamp repair rules
    #[serde(default)]
    pub timestamps: TimestampConfig,

    /// Rule-based segmenter limits
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Word timing cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// LLM provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
    // @provider: DeepSeek (OpenAI-compatible)
    DeepSeek,
    // @provider: SiliconFlow (OpenAI-compatible)
    SiliconFlow,
}

impl LlmProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
            Self::DeepSeek => "DeepSeek",
            Self::SiliconFlow => "SiliconFlow",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
            Self::DeepSeek => "deepseek".to_string(),
            Self::SiliconFlow => "siliconflow".to_string(),
        }
    }

    // @returns: Whether the provider is a hosted API that needs a key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic | Self::DeepSeek | Self::SiliconFlow)
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            "deepseek" => Ok(Self::DeepSeek),
            "siliconflow" => Ok(Self::SiliconFlow),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds per request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Completion token limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: LlmProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(&provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(&provider_type),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// LLM service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    /// Use the LLM path at all; when false every job is rule-based
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Provider to use
    #[serde(default)]
    pub provider: LlmProvider,

    /// Available providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Settings shared by all providers
    #[serde(default)]
    pub common: LlmCommonConfig,
}

/// Settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmCommonConfig {
    /// System prompt sent with every request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
        }
    }
}

/// Chunking and segment sizing
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SegmentationConfig {
    /// Split long jobs into several LLM calls
    #[serde(default = "default_true")]
    pub enable_chunking: bool,

    /// Maximum words per chunk
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Upper bound of the segment length band given to the LLM
    #[serde(default = "default_max_segment_words")]
    pub max_segment_words: usize,

    /// Chunks aligning fewer segments than this fraction fall back to rules
    #[serde(default = "default_min_segment_match_rate")]
    pub min_segment_match_rate: f64,

    /// Characters that end a sentence
    #[serde(default = "default_sentence_terminators")]
    pub sentence_terminators: String,

    /// Text similarity under which a smart split is reported as drifting
    #[serde(default = "default_smart_integrity_threshold")]
    pub smart_integrity_threshold: f64,

    /// Text similarity under which a simple split is reported as drifting
    #[serde(default = "default_simple_integrity_threshold")]
    pub simple_integrity_threshold: f64,
}

impl SegmentationConfig {
    /// Sentence terminators as characters
    pub fn terminators(&self) -> Vec<char> {
        self.sentence_terminators.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            enable_chunking: true,
            max_chunk_size: default_max_chunk_size(),
            max_segment_words: default_max_segment_words(),
            min_segment_match_rate: default_min_segment_match_rate(),
            sentence_terminators: default_sentence_terminators(),
            smart_integrity_threshold: default_smart_integrity_threshold(),
            simple_integrity_threshold: default_simple_integrity_threshold(),
        }
    }
}

/// Word timing cache configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory (platform cache dir when unset)
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Fail the job when the cache directory is unusable
    #[serde(default)]
    pub required: bool,

    /// How keys are derived when a subtitle file accompanies the media
    #[serde(default)]
    pub key_policy: KeyPolicy,
}

impl CacheConfig {
    /// Directory holding cache files
    pub fn resolve_directory(&self) -> PathBuf {
        match &self.directory {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("resegment")
                .join("word_cache"),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            required: false,
            key_policy: KeyPolicy::default(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_max_chunk_size() -> usize {
    500
}

fn default_max_segment_words() -> usize {
    13
}

fn default_min_segment_match_rate() -> f64 {
    0.5
}

fn default_sentence_terminators() -> String {
    ".!?。！？".to_string()
}

fn default_smart_integrity_threshold() -> f64 {
    0.90
}

fn default_simple_integrity_threshold() -> f64 {
    0.95
}

fn default_system_prompt() -> String {
    "You are an expert subtitle editor.".to_string()
}

fn default_endpoint(provider: &LlmProvider) -> String {
    match provider {
        LlmProvider::Ollama => "http://localhost:11434",
        LlmProvider::OpenAI => "https://api.openai.com/v1",
        LlmProvider::Anthropic => "https://api.anthropic.com",
        // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
        LlmProvider::LMStudio => "http://localhost:1234/v1",
        LlmProvider::DeepSeek => "https://api.deepseek.com/v1",
        LlmProvider::SiliconFlow => "https://api.siliconflow.cn/v1",
    }
    .to_string()
}

fn default_model(provider: &LlmProvider) -> String {
    match provider {
        LlmProvider::Ollama => "llama3",
        LlmProvider::OpenAI => "gpt-4o-mini",
        LlmProvider::Anthropic => "claude-3-haiku-20240307",
        // Placeholder; users should set to the loaded model name in LM Studio
        LlmProvider::LMStudio => "local-model",
        LlmProvider::DeepSeek => "deepseek-chat",
        LlmProvider::SiliconFlow => "Qwen/Qwen2.5-7B-Instruct",
    }
    .to_string()
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create config file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !self.language.eq_ignore_ascii_case("auto") {
            let _name = crate::language_utils::get_language_name(&self.language)?;
        }

        if self.llm.enabled {
            if self.llm.provider.requires_api_key() && self.llm.get_api_key().is_empty() {
                return Err(anyhow!(
                    "API key is required for {} provider",
                    self.llm.provider.display_name()
                ));
            }

            let endpoint = self.llm.get_endpoint();
            url::Url::parse(&endpoint)
                .with_context(|| format!("Invalid endpoint URL: {}", endpoint))?;
        }

        if self.segmentation.max_chunk_size == 0 {
            return Err(anyhow!("max_chunk_size must be at least 1"));
        }
        if self.segmentation.max_segment_words < 2 {
            return Err(anyhow!("max_segment_words must be at least 2"));
        }
        if !(0.0..=1.0).contains(&self.segmentation.min_segment_match_rate) {
            return Err(anyhow!("min_segment_match_rate must be between 0 and 1"));
        }
        if self.fallback.max_words == 0 || self.fallback.max_duration_secs <= 0.0 {
            return Err(anyhow!("Fallback limits must be positive"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            language: default_language(),
            llm: LlmConfig::default(),
            segmentation: SegmentationConfig::default(),
            alignment: AlignmentConfig::default(),
            timestamps: TimestampConfig::default(),
            fallback: FallbackConfig::default(),
            cache: CacheConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl LlmConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }
        default_model(&self.provider)
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        // Local providers don't use API keys
        String::new()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }
        default_endpoint(&self.provider)
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Get the completion token limit for the active provider
    pub fn get_max_tokens(&self) -> u32 {
        self.get_active_provider_config()
            .map(|p| p.max_tokens)
            .filter(|tokens| *tokens > 0)
            .unwrap_or_else(default_max_tokens)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: LlmProvider::default(),
            available_providers: vec![
                ProviderConfig::new(LlmProvider::Ollama),
                ProviderConfig::new(LlmProvider::OpenAI),
                ProviderConfig::new(LlmProvider::Anthropic),
                ProviderConfig::new(LlmProvider::LMStudio),
                ProviderConfig::new(LlmProvider::DeepSeek),
                ProviderConfig::new(LlmProvider::SiliconFlow),
            ],
            common: LlmCommonConfig::default(),
        }
    }
}
