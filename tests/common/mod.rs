/*!
 * Common test utilities for the resegment test suite
 */

use anyhow::Result;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use resegment::app_config::Config;
use resegment::errors::RecognitionError;
use resegment::recognizer::{Recognizer, Transcription};
use resegment::words::{Word, WordStore};

/// Transcript used by most pipeline tests: three sentences, fifteen words
pub const SAMPLE_TRANSCRIPT: &str = "The quick brown fox jumps. It was late so we left. We all went home.";

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
"#;
    create_test_file(dir, filename, content)
}

/// One word per whitespace-separated token, `step` seconds apart
pub fn words_from(text: &str, step: f64) -> Vec<Word> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, w)| Word::new(w, i as f64 * step, i as f64 * step + step * 0.8))
        .collect()
}

/// Config for tests: no network client, no retry delays
pub fn test_config() -> Config {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut config = Config::default();
    config.llm.enabled = false;
    config.llm.common.retry_count = 0;
    config.llm.common.retry_backoff_ms = 1;
    config
}

/// Recognizer returning fixed words and counting its calls
#[derive(Clone)]
pub struct FixtureRecognizer {
    words: Vec<Word>,
    language: String,
    calls: Arc<AtomicUsize>,
}

impl FixtureRecognizer {
    pub fn new(words: Vec<Word>) -> Self {
        Self {
            words,
            language: "en".to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recognizer for FixtureRecognizer {
    async fn transcribe(&self, media_path: &Path) -> Result<Transcription, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.words.is_empty() {
            return Err(RecognitionError::NoSpeech(media_path.display().to_string()));
        }
        Ok(Transcription {
            words: WordStore::new(self.words.clone()),
            language: self.language.clone(),
        })
    }
}
