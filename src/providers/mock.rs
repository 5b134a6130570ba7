/*!
 * Mock LLM client for testing.
 *
 * This module provides a client that simulates different behaviors:
 * - `MockProvider::working()` - Splits the prompt text into sentence segments
 * - `MockProvider::failing(kind)` - Always fails with the given error kind
 * - `MockProvider::intermittent(n)` - Fails every nth request
 * - `MockProvider::scripted(..)` - Replays a fixed sequence of outcomes
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::{LlmError, LlmErrorKind};
use crate::providers::{FragmentCallback, LlmClient};
use crate::segmentation::chunking::split_sentences;
use crate::segmentation::prompts::extract_prompt_text;
use crate::words::DEFAULT_SENTENCE_TERMINATORS;

/// Longest segment produced by the default response
const MOCK_SEGMENT_WORDS: usize = 8;

/// Size of the pieces a response is streamed in
const FRAGMENT_CHARS: usize = 16;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a segment array
    Working,
    /// Always fails with an error of this kind
    Failing(LlmErrorKind),
    /// Returns an empty response
    Empty,
    /// Returns text with no JSON array in it
    Malformed,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Replays the scripted outcomes, then behaves like `Working`
    Scripted,
}

/// Outcome returned by a scripted mock
pub type ScriptedOutcome = Result<String, LlmErrorKind>;

/// Mock LLM client
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&str) -> String>,
    /// Prompts received so far
    prompts: Arc<Mutex<Vec<String>>>,
    script: Arc<Mutex<VecDeque<ScriptedOutcome>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing(kind: LlmErrorKind) -> Self {
        Self::new(MockBehavior::Failing(kind))
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers with prose instead of JSON
    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a mock replaying `outcomes` in order
    pub fn scripted(outcomes: Vec<ScriptedOutcome>) -> Self {
        let provider = Self::new(MockBehavior::Scripted);
        provider.script.lock().extend(outcomes);
        provider
    }

    /// Set a custom response generator, called with the prompt
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of `complete` calls so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Default answer: the prompt text split into sentence segments
    pub fn generate_segments_response(prompt: &str) -> String {
        let text = extract_prompt_text(prompt).unwrap_or(prompt);
        let mut segments = Vec::new();

        for sentence in split_sentences(text, DEFAULT_SENTENCE_TERMINATORS) {
            let words: Vec<&str> = sentence.split_whitespace().collect();
            if words.len() <= MOCK_SEGMENT_WORDS {
                segments.push(sentence);
            } else {
                segments.extend(words.chunks(MOCK_SEGMENT_WORDS).map(|group| group.join(" ")));
            }
        }

        let values: Vec<serde_json::Value> = if prompt.contains("\"word_count\"") {
            segments
                .iter()
                .map(|s| serde_json::json!({ "text": s, "word_count": s.split_whitespace().count() }))
                .collect()
        } else {
            segments.iter().map(|s| serde_json::Value::String(s.clone())).collect()
        };

        serde_json::Value::Array(values).to_string()
    }

    fn error_of(kind: LlmErrorKind, count: usize) -> LlmError {
        let message = format!("Simulated failure (request #{})", count + 1);
        match kind {
            LlmErrorKind::Timeout => LlmError::Timeout(message),
            LlmErrorKind::Transport => LlmError::Transport(message),
            LlmErrorKind::AuthRejected => LlmError::AuthRejected(message),
            LlmErrorKind::RateLimited => LlmError::RateLimited(message),
        }
    }

    fn working_response(&self, prompt: &str) -> String {
        match self.custom_response {
            Some(generator) => generator(prompt),
            None => Self::generate_segments_response(prompt),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
            prompts: Arc::clone(&self.prompts),
            script: Arc::clone(&self.script),
        }
    }
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("behavior", &self.behavior)
            .field("request_count", &self.request_count())
            .finish()
    }
}

/// Deliver `text` to the callback in small pieces
fn stream_fragments(text: &str, on_fragment: &Option<FragmentCallback>) {
    let Some(callback) = on_fragment else {
        return;
    };
    let chars: Vec<char> = text.chars().collect();
    for piece in chars.chunks(FRAGMENT_CHARS) {
        let fragment: String = piece.iter().collect();
        callback(&fragment);
    }
}

#[async_trait]
impl LlmClient for MockProvider {
    async fn complete(&self, prompt: &str, on_fragment: Option<FragmentCallback>) -> Result<String, LlmError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        let text = match self.behavior {
            MockBehavior::Working => self.working_response(prompt),
            MockBehavior::Failing(kind) => return Err(Self::error_of(kind, count)),
            MockBehavior::Empty => String::new(),
            MockBehavior::Malformed => "Sure! Here are your subtitles, nicely split.".to_string(),
            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    return Err(LlmError::Api {
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                    });
                }
                self.working_response(prompt)
            }
            MockBehavior::Scripted => {
                let next = self.script.lock().pop_front();
                match next {
                    Some(Ok(text)) => text,
                    Some(Err(kind)) => return Err(Self::error_of(kind, count)),
                    None => self.working_response(prompt),
                }
            }
        };

        stream_fragments(&text, &on_fragment);
        Ok(text)
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
