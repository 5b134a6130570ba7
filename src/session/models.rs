/*!
 * Job-level models for resegmentation sessions.
 *
 * A job turns one media file and/or one subtitle file into a list of cues.
 * These types describe the request, the progress events emitted while it
 * runs and the outcome handed back to the caller.
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::subtitle_processor::Cue;

/// Input of one job
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Media file to recognize
    pub media_path: Option<PathBuf>,
    /// Existing subtitle file whose text is kept
    pub subtitle_path: Option<PathBuf>,
    /// Language code, or "auto"
    pub language_hint: String,
    /// Allow LLM splitting; false forces the rule-based split
    pub use_llm: bool,
}

impl JobRequest {
    /// Recognize `media_path` and split its transcript
    pub fn media(media_path: impl Into<PathBuf>) -> Self {
        Self {
            media_path: Some(media_path.into()),
            subtitle_path: None,
            language_hint: "auto".to_string(),
            use_llm: true,
        }
    }

    /// Resplit an existing subtitle file
    pub fn subtitle(subtitle_path: impl Into<PathBuf>) -> Self {
        Self {
            media_path: None,
            subtitle_path: Some(subtitle_path.into()),
            language_hint: "auto".to_string(),
            use_llm: true,
        }
    }

    /// Keep the text of `subtitle_path`, time it against `media_path`
    pub fn media_with_subtitle(media_path: impl Into<PathBuf>, subtitle_path: impl Into<PathBuf>) -> Self {
        Self {
            media_path: Some(media_path.into()),
            subtitle_path: Some(subtitle_path.into()),
            language_hint: "auto".to_string(),
            use_llm: true,
        }
    }

    pub fn with_language(mut self, language_hint: impl Into<String>) -> Self {
        self.language_hint = language_hint.into();
        self
    }

    pub fn without_llm(mut self) -> Self {
        self.use_llm = false;
        self
    }

    /// File the output name is derived from
    pub fn primary_path(&self) -> Option<&Path> {
        self.media_path.as_deref().or(self.subtitle_path.as_deref())
    }
}

/// How a job produces its cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobMode {
    /// Existing cues are resplit by the LLM without media
    SubtitleOnly,
    /// Media timings with the text of an existing subtitle file
    MediaWithSubtitle,
    /// Media timings with the recognized transcript as text
    MediaOnly,
    /// No LLM: sentence/duration/word-count rules only
    RuleBased,
}

impl JobMode {
    /// Suffix added to the output file stem
    pub fn output_suffix(&self) -> &'static str {
        match self {
            JobMode::MediaWithSubtitle => "_llm_smart",
            JobMode::MediaOnly => "_llm_resplit",
            JobMode::SubtitleOnly => "_llm_split",
            JobMode::RuleBased => "_rule_split",
        }
    }

    pub fn uses_llm(&self) -> bool {
        !matches!(self, JobMode::RuleBased)
    }
}

impl std::fmt::Display for JobMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobMode::SubtitleOnly => "subtitle only",
            JobMode::MediaWithSubtitle => "media with subtitle",
            JobMode::MediaOnly => "media only",
            JobMode::RuleBased => "rule based",
        };
        write!(f, "{}", name)
    }
}

/// Overall result state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Every chunk was split by the LLM
    Success,
    /// Some chunks fell back to rules
    Partial,
    /// All cues come from the rule-based segmenter
    RuleBased,
}

/// Counters collected while a job runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub total_chunks: usize,
    pub llm_chunks: usize,
    pub fallback_chunks: usize,
    pub unaligned_segments: usize,
    pub low_confidence_segments: usize,
    /// Chunks whose LLM text drifted from the source
    pub integrity_warnings: usize,
    pub cache_hit: bool,
    pub word_count: usize,
    pub cue_count: usize,
}

impl JobSummary {
    pub fn status(&self) -> JobStatus {
        if self.llm_chunks == 0 {
            JobStatus::RuleBased
        } else if self.fallback_chunks > 0 {
            JobStatus::Partial
        } else {
            JobStatus::Success
        }
    }
}

/// Progress notifications emitted during a job
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    ModeSelected(JobMode),
    CacheHit { key: String },
    CacheMiss { key: String },
    Recognized { words: usize, language: String },
    ChunkStarted { index: usize, total: usize, words: usize },
    /// Streamed LLM text for the current chunk
    LlmFragment { chunk: usize, text: String },
    ChunkFinished { index: usize, cues: usize, used_llm: bool },
    Finished { status: JobStatus, cues: usize },
}

/// Receives job events; must not block
pub type EventCallback = Arc<dyn Fn(&JobEvent) + Send + Sync>;

/// Shared flag checked between chunks
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a finished job
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: String,
    pub mode: JobMode,
    pub cues: Vec<Cue>,
    /// Language reported by the recognizer or the request
    pub language: String,
    pub summary: JobSummary,
}

impl JobOutcome {
    pub fn new(mode: JobMode, cues: Vec<Cue>, language: String, summary: JobSummary) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            mode,
            cues,
            language,
            summary,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.summary.status()
    }
}
