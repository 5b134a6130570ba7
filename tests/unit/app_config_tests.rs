/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use resegment::app_config::{Config, LlmProvider, LogLevel, ProviderConfig};
use resegment::cache::KeyPolicy;
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.language, "auto");
    assert_eq!(config.llm.provider, LlmProvider::Ollama);
    assert!(config.llm.enabled);
    assert_eq!(config.segmentation.max_chunk_size, 500);
    assert_eq!(config.segmentation.max_segment_words, 13);
    assert_eq!(config.alignment.lookahead, 10);
    assert_eq!(config.fallback.max_words, 12);
    assert_eq!(config.fallback.max_duration_secs, 5.0);
    assert_eq!(config.cache.key_policy, KeyPolicy::MediaOnly);
    assert!(!config.cache.required);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    // Invalid language
    config.language = "xyz".to_string();
    assert!(config.validate().is_err());
    config.language = "en".to_string();
    assert!(config.validate().is_ok());

    // Hosted provider without an API key
    config.llm.provider = LlmProvider::OpenAI;
    config.llm.available_providers = vec![ProviderConfig::new(LlmProvider::OpenAI)];
    assert!(config.validate().is_err());

    config.llm.available_providers[0].api_key = "sk-1234567890".to_string();
    assert!(config.validate().is_ok());

    // Rule-based only configs need no key
    config.llm.available_providers[0].api_key.clear();
    config.llm.enabled = false;
    assert!(config.validate().is_ok());

    config.segmentation.max_chunk_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_saveAndLoad_shouldRoundTrip() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    config.language = "fr".to_string();
    config.segmentation.max_chunk_size = 250;
    config.cache.key_policy = KeyPolicy::MediaAndSubtitle;
    config.save_to_file(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.language, "fr");
    assert_eq!(loaded.segmentation.max_chunk_size, 250);
    assert_eq!(loaded.cache.key_policy, KeyPolicy::MediaAndSubtitle);
    Ok(())
}

#[test]
fn test_config_partialFile_shouldFillDefaults() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(dir.path(), "conf.json", r#"{ "language": "ja", "segmentation": { "max_segment_words": 20 } }"#)?;

    let config = Config::from_file(&path)?;
    assert_eq!(config.language, "ja");
    assert_eq!(config.segmentation.max_segment_words, 20);
    assert_eq!(config.segmentation.max_chunk_size, 500);
    assert_eq!(config.timestamps.max_secs_per_word, 1.0);
    Ok(())
}

#[test]
fn test_llmProvider_fromStr_shouldAcceptAnyCase() {
    assert_eq!("DeepSeek".parse::<LlmProvider>().unwrap(), LlmProvider::DeepSeek);
    assert_eq!(LlmProvider::LMStudio.to_string(), "lmstudio");
    assert!("nope".parse::<LlmProvider>().is_err());
}
