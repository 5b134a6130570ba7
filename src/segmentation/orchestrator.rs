/*!
 * Chunk rewriting through an LLM client.
 *
 * The orchestrator builds the split prompt for a chunk, sends it through the
 * injected client and retries recoverable failures with exponential backoff.
 * A final failure only affects the chunk it was raised for.
 */

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::LlmConfig;
use crate::errors::LlmError;
use crate::providers::{FragmentCallback, LlmClient};
use crate::segmentation::parser::{self, Segment};
use crate::segmentation::prompts::{SplitMode, SplitPromptBuilder};

/// Sends chunk prompts to an LLM with retries
#[derive(Clone)]
pub struct RewriteOrchestrator {
    client: Arc<dyn LlmClient>,
    retry_count: u32,
    retry_backoff_ms: u64,
}

impl RewriteOrchestrator {
    pub fn new(client: Arc<dyn LlmClient>, retry_count: u32, retry_backoff_ms: u64) -> Self {
        Self {
            client,
            retry_count,
            retry_backoff_ms,
        }
    }

    /// Use the retry settings of `config`
    pub fn from_config(client: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self::new(client, config.common.retry_count, config.common.retry_backoff_ms)
    }

    /// Ask the LLM to split `chunk_text`, returning its raw answer
    pub async fn rewrite(
        &self,
        chunk_text: &str,
        language_hint: &str,
        max_segment_words: usize,
        mode: SplitMode,
        on_fragment: Option<FragmentCallback>,
    ) -> Result<String, LlmError> {
        let prompt = SplitPromptBuilder::new(max_segment_words, mode)
            .with_language(language_hint)
            .build(chunk_text);

        let mut attempt: u32 = 0;
        loop {
            debug!("Sending {} chars to {} (attempt {}/{})", prompt.len(), self.client.name(), attempt + 1, self.retry_count + 1);

            match self.client.complete(&prompt, on_fragment.clone()).await {
                Ok(text) => {
                    if attempt > 0 {
                        info!("{} succeeded after {} retries", self.client.name(), attempt);
                    }
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < self.retry_count => {
                    let backoff_ms = self.retry_backoff_ms.saturating_mul(1u64 << attempt.min(16));
                    warn!(
                        "{} request failed: {} - retrying in {}ms (attempt {}/{})",
                        self.client.name(),
                        e,
                        backoff_ms,
                        attempt + 1,
                        self.retry_count + 1
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("{} request failed after {} attempts: {}", self.client.name(), attempt + 1, e);
                    return Err(e);
                }
            }
        }
    }

    /// Rewrite `chunk_text` and parse the answer into segments
    pub async fn rewrite_segments(
        &self,
        chunk_text: &str,
        language_hint: &str,
        max_segment_words: usize,
        mode: SplitMode,
        on_fragment: Option<FragmentCallback>,
    ) -> Result<Vec<Segment>, LlmError> {
        let response = self
            .rewrite(chunk_text, language_hint, max_segment_words, mode, on_fragment)
            .await?;
        Ok(parser::parse(&response))
    }
}

impl std::fmt::Debug for RewriteOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteOrchestrator")
            .field("client", &self.client.name())
            .field("retry_count", &self.retry_count)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}
