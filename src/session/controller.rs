/*!
 * Session controller: runs one resegmentation job end to end.
 *
 * The controller picks the job mode, loads or recognizes the word timings,
 * plans chunks and sends each one through the LLM split and the aligner.
 * A chunk that cannot be split or aligned is covered by the rule-based
 * segmenter instead, so a job only fails when there are no words to work
 * with, the cache is mandatory and broken, or the caller cancels it.
 */

use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::app_config::Config;
use crate::cache::{key_for_files, ContentCache};
use crate::errors::{LlmError, RecognitionError, ResegmentError};
use crate::file_utils::{FileManager, FileType};
use crate::language_utils;
use crate::providers::{self, FragmentCallback, LlmClient};
use crate::recognizer::Recognizer;
use crate::segmentation::{
    check_integrity, Aligner, AlignmentRun, Chunk, ChunkPlanner, FallbackSegmenter, IntegrityReport,
    RewriteOrchestrator, SplitMode, TimestampValidator,
};
use crate::subtitle_processor::{Cue, SubtitleCollection};
use crate::words::WordStore;

use super::models::{CancellationFlag, EventCallback, JobEvent, JobMode, JobOutcome, JobRequest, JobSummary};

/// Why a chunk was handed to the rule-based segmenter
#[derive(Error, Debug)]
enum ChunkFailure {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("chunk has no target text")]
    EmptyText,

    #[error("LLM returned no usable segments")]
    NoSegments,

    #[error("alignment rate {rate:.2} below {min:.2}")]
    LowAlignment { rate: f64, min: f64 },
}

/// Words and texts a job works on once its inputs are loaded
struct JobInput {
    words: WordStore,
    reference: Option<String>,
    language: String,
    cache_hit: bool,
}

/// Runs resegmentation jobs against one configuration
pub struct SessionController {
    // @field: Engine configuration
    config: Config,

    // @field: Word timing cache shared by all jobs
    cache: ContentCache,

    // @field: Speech recognizer, required for media jobs
    recognizer: Option<Arc<dyn Recognizer>>,

    // @field: LLM client, None means rule-based splitting only
    llm: Option<Arc<dyn LlmClient>>,
}

impl SessionController {
    // @method: Create a controller, building the LLM client from the config when enabled
    pub fn new(config: Config) -> Self {
        let cache = ContentCache::from_config(&config.cache);
        let llm = if config.llm.enabled {
            Some(providers::create_client(&config.llm))
        } else {
            None
        };

        Self {
            config,
            cache,
            recognizer: None,
            llm,
        }
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_llm_client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(client);
        self
    }

    pub fn without_llm(mut self) -> Self {
        self.llm = None;
        self
    }

    pub fn with_cache(mut self, cache: ContentCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decide how `request` will be processed
    pub fn select_mode(&self, request: &JobRequest) -> Result<JobMode, ResegmentError> {
        if request.media_path.is_none() && request.subtitle_path.is_none() {
            return Err(ResegmentError::Config("Job has neither a media nor a subtitle file".to_string()));
        }
        if request.media_path.is_some() && self.recognizer.is_none() {
            return Err(ResegmentError::Config("Media job without a speech recognizer".to_string()));
        }

        if !request.use_llm || self.llm.is_none() {
            return Ok(JobMode::RuleBased);
        }

        Ok(match (&request.media_path, &request.subtitle_path) {
            (Some(_), Some(_)) => JobMode::MediaWithSubtitle,
            (Some(_), None) => JobMode::MediaOnly,
            _ => JobMode::SubtitleOnly,
        })
    }

    /// Build a request for a single input file.
    ///
    /// Media files pick up a subtitle file with the same stem next to them.
    pub fn request_for_file<P: AsRef<Path>>(&self, path: P) -> Result<JobRequest, ResegmentError> {
        let path = path.as_ref();
        let file_type = FileManager::detect_file_type(path)?;

        let request = match file_type {
            FileType::Subtitle => JobRequest::subtitle(path),
            FileType::Media => match FileManager::sibling_subtitle(path) {
                Some(subtitle) => {
                    info!("Using existing subtitles {:?} for {:?}", subtitle, path);
                    JobRequest::media_with_subtitle(path, subtitle)
                }
                None => JobRequest::media(path),
            },
            FileType::Unknown => {
                return Err(ResegmentError::File(format!("Unsupported input file: {:?}", path)));
            }
        };

        Ok(request.with_language(self.config.language.clone()))
    }

    // @method: Run one job to completion
    pub async fn run(
        &self,
        request: &JobRequest,
        events: Option<EventCallback>,
        cancel: &CancellationFlag,
    ) -> Result<JobOutcome, ResegmentError> {
        let mode = self.select_mode(request)?;
        info!("Starting {} job for {:?}", mode, request.primary_path());
        emit(&events, JobEvent::ModeSelected(mode));

        let input = self.load_input(request, &events).await?;
        if input.words.is_empty() {
            let source = request
                .primary_path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(RecognitionError::NoSpeech(source).into());
        }

        let (cues, mut summary) = self
            .resegment_words(mode, &input.words, input.reference.as_deref(), &input.language, &events, cancel)
            .await?;

        let validator = TimestampValidator::new(self.config.timestamps.clone());
        let report = validator.inspect(&cues);
        if !report.is_clean() {
            debug!("Repairing {} timestamp issues", report.issues.len());
            for issue in &report.issues {
                debug!("{}", issue);
            }
        }
        let cues = validator.validate(cues);

        summary.cache_hit = input.cache_hit;
        summary.word_count = input.words.len();
        summary.cue_count = cues.len();

        let outcome = JobOutcome::new(mode, cues, input.language, summary);
        info!(
            "Job {} finished: {} cues from {} words ({} LLM chunks, {} fallback chunks)",
            outcome.job_id,
            outcome.summary.cue_count,
            outcome.summary.word_count,
            outcome.summary.llm_chunks,
            outcome.summary.fallback_chunks
        );
        if mode != JobMode::SubtitleOnly {
            let (hits, misses, hit_rate) = self.cache.stats();
            debug!("Word cache: {} hits, {} misses ({:.0}% hit rate)", hits, misses, hit_rate * 100.0);
        }
        emit(
            &events,
            JobEvent::Finished {
                status: outcome.status(),
                cues: outcome.cues.len(),
            },
        );

        Ok(outcome)
    }

    /// Load word timings and the target text for `request`
    async fn load_input(&self, request: &JobRequest, events: &Option<EventCallback>) -> Result<JobInput, ResegmentError> {
        let subtitles = match &request.subtitle_path {
            Some(path) => Some(read_subtitles(path)?),
            None => None,
        };

        let Some(media) = &request.media_path else {
            let cues = subtitles.map(|s| s.cues).unwrap_or_default();
            return Ok(JobInput {
                words: WordStore::from_cues(&cues),
                reference: None,
                language: request.language_hint.clone(),
                cache_hit: false,
            });
        };

        let (words, recognized, cache_hit) = self.recognize(media, request.subtitle_path.as_deref(), events).await?;
        let language = resolve_language(&request.language_hint, &recognized);

        Ok(JobInput {
            words,
            reference: subtitles.map(|s| s.plain_text()),
            language,
            cache_hit,
        })
    }

    /// Word timings for `media`, from the cache when possible
    async fn recognize(
        &self,
        media: &Path,
        subtitle: Option<&Path>,
        events: &Option<EventCallback>,
    ) -> Result<(WordStore, String, bool), ResegmentError> {
        let recognizer = self
            .recognizer
            .as_ref()
            .ok_or_else(|| ResegmentError::Config("Media job without a speech recognizer".to_string()))?;

        if self.config.cache.required {
            self.cache.ensure_directory()?;
        }

        let key = if self.cache.is_enabled() {
            match key_for_files(media, subtitle, self.config.cache.key_policy).await {
                Ok(key) => Some(key),
                Err(e) if self.config.cache.required => return Err(e.into()),
                Err(e) => {
                    warn!("Cannot fingerprint {:?}, cache bypassed: {}", media, e);
                    None
                }
            }
        } else {
            None
        };

        if let Some(key) = &key {
            if let Some(entry) = self.cache.get(key) {
                info!("Reusing cached word timings for {:?}", media);
                emit(events, JobEvent::CacheHit { key: key.clone() });
                return Ok((entry.words, entry.language, true));
            }
            emit(events, JobEvent::CacheMiss { key: key.clone() });
        }

        info!("Recognizing speech in {:?}", media);
        let transcription = recognizer.transcribe(media).await?;
        emit(
            events,
            JobEvent::Recognized {
                words: transcription.words.len(),
                language: transcription.language.clone(),
            },
        );

        if let Some(key) = &key {
            if !transcription.words.is_empty() {
                if let Err(e) = self.cache.store(key, &transcription.words, &transcription.language).await {
                    if self.config.cache.required {
                        return Err(e.into());
                    }
                    warn!("Failed to cache word timings for {:?}: {}", media, e);
                }
            }
        }

        Ok((transcription.words, transcription.language, false))
    }

    /// Turn `words` into cues according to `mode`.
    ///
    /// `reference` replaces the transcript as the target text when given.
    /// Cues are returned before timestamp validation.
    pub async fn resegment_words(
        &self,
        mode: JobMode,
        words: &WordStore,
        reference: Option<&str>,
        language: &str,
        events: &Option<EventCallback>,
        cancel: &CancellationFlag,
    ) -> Result<(Vec<Cue>, JobSummary), ResegmentError> {
        let fallback = FallbackSegmenter::new(&self.config.fallback)
            .with_terminators(self.config.segmentation.terminators());
        let mut summary = JobSummary::default();

        let orchestrator = match (&self.llm, mode.uses_llm()) {
            (Some(client), true) => RewriteOrchestrator::from_config(client.clone(), &self.config.llm),
            _ => {
                if cancel.is_cancelled() {
                    return Err(ResegmentError::Cancelled);
                }
                let cues = fallback.segment(words.words());
                summary.total_chunks = 1;
                summary.fallback_chunks = 1;
                emit(events, JobEvent::ChunkStarted { index: 0, total: 1, words: words.len() });
                emit(events, JobEvent::ChunkFinished { index: 0, cues: cues.len(), used_llm: false });
                return Ok((cues, summary));
            }
        };

        let seg_cfg = &self.config.segmentation;
        let max_chunk_size = if seg_cfg.enable_chunking {
            seg_cfg.max_chunk_size
        } else {
            usize::MAX
        };
        let planner = ChunkPlanner::new(seg_cfg.terminators());
        let plan = match reference {
            Some(reference) => planner.plan_with_reference(words.words(), reference, max_chunk_size),
            None => planner.plan(words.words(), max_chunk_size),
        };
        summary.total_chunks = plan.len();

        let aligner = Aligner::new(self.config.alignment.clone());
        let lookahead = self.config.alignment.lookahead;
        let mut cues: Vec<Cue> = Vec::new();
        let mut cursor = 0usize;

        for chunk in &plan {
            if cancel.is_cancelled() {
                warn!("Job cancelled before chunk {}/{}", chunk.index + 1, plan.len());
                return Err(ResegmentError::Cancelled);
            }

            info!(
                "Processing chunk {}/{} ({} words)",
                chunk.index + 1,
                plan.len(),
                chunk.word_count()
            );
            emit(
                events,
                JobEvent::ChunkStarted {
                    index: chunk.index,
                    total: plan.len(),
                    words: chunk.word_count(),
                },
            );

            // Words the previous chunk left unconsumed are searched again here,
            // unless there are too many of them to be plausible.
            let leftover = chunk.words.start.saturating_sub(cursor);
            if leftover > lookahead.max(chunk.word_count() / 4) {
                debug!("Filling {} unaligned words before chunk {}", leftover, chunk.index + 1);
                cues.extend(fallback.segment(words.slice(cursor..chunk.words.start)));
                cursor = chunk.words.start;
            }

            let chunk_cues = match self
                .process_chunk(&orchestrator, &aligner, mode, chunk, words, cursor, language, events)
                .await
            {
                Ok((run, integrity)) => {
                    summary.llm_chunks += 1;
                    if !integrity.passed {
                        summary.integrity_warnings += 1;
                    }
                    summary.unaligned_segments += run.unaligned.len();
                    summary.low_confidence_segments += run.low_confidence_count();
                    cursor = run.next_word_index;
                    emit(events, JobEvent::ChunkFinished { index: chunk.index, cues: run.aligned.len(), used_llm: true });
                    run.cues()
                }
                Err(failure) => {
                    warn!(
                        "Chunk {}/{} falls back to rule-based splitting: {}",
                        chunk.index + 1,
                        plan.len(),
                        failure
                    );
                    summary.fallback_chunks += 1;
                    let fallback_cues = fallback.segment(words.slice(cursor..chunk.words.end));
                    cursor = chunk.words.end;
                    emit(events, JobEvent::ChunkFinished { index: chunk.index, cues: fallback_cues.len(), used_llm: false });
                    fallback_cues
                }
            };

            cues.extend(chunk_cues);
        }

        if cursor < words.len() {
            debug!("Filling {} trailing words not covered by any segment", words.len() - cursor);
            cues.extend(fallback.segment(words.slice(cursor..words.len())));
        }

        Ok((cues, summary))
    }

    /// Split one chunk with the LLM and align its segments from `cursor`
    #[allow(clippy::too_many_arguments)]
    async fn process_chunk(
        &self,
        orchestrator: &RewriteOrchestrator,
        aligner: &Aligner,
        mode: JobMode,
        chunk: &Chunk,
        words: &WordStore,
        cursor: usize,
        language: &str,
        events: &Option<EventCallback>,
    ) -> Result<(AlignmentRun, IntegrityReport), ChunkFailure> {
        if chunk.text.trim().is_empty() {
            return Err(ChunkFailure::EmptyText);
        }

        let split_mode = match mode {
            JobMode::SubtitleOnly => SplitMode::Simple,
            _ => SplitMode::Smart {
                approx_word_count: chunk.text_range.len(),
            },
        };

        let on_fragment = events.clone().map(|callback| {
            let index = chunk.index;
            Arc::new(move |text: &str| {
                callback(&JobEvent::LlmFragment {
                    chunk: index,
                    text: text.to_string(),
                })
            }) as FragmentCallback
        });

        let segments = orchestrator
            .rewrite_segments(
                &chunk.text,
                language,
                self.config.segmentation.max_segment_words,
                split_mode,
                on_fragment,
            )
            .await?;
        if segments.is_empty() {
            return Err(ChunkFailure::NoSegments);
        }

        let threshold = match split_mode {
            SplitMode::Simple => self.config.segmentation.simple_integrity_threshold,
            SplitMode::Smart { .. } => self.config.segmentation.smart_integrity_threshold,
        };
        let integrity = check_integrity(&chunk.text, &segments, threshold);
        if !integrity.passed {
            debug!("Chunk {} text similarity {:.2}", chunk.index + 1, integrity.similarity);
        }

        let run = aligner.align_all(&segments, words.words(), cursor..chunk.words.end);
        let rate = run.alignment_rate();
        let min = self.config.segmentation.min_segment_match_rate;
        if rate < min {
            return Err(ChunkFailure::LowAlignment { rate, min });
        }

        debug!(
            "Chunk {} aligned {}/{} segments, cursor {} -> {}",
            chunk.index + 1,
            run.aligned.len(),
            segments.len(),
            cursor,
            run.next_word_index
        );
        Ok((run, integrity))
    }

    /// Path the result of `request` is written to
    pub fn output_path(&self, request: &JobRequest, mode: JobMode, output_dir: Option<&Path>) -> Option<PathBuf> {
        request
            .primary_path()
            .map(|input| FileManager::generate_output_path(input, output_dir, mode.output_suffix()))
    }

    /// Write the cues of `outcome` as SubRip
    pub fn write_srt<P: AsRef<Path>>(&self, outcome: &JobOutcome, path: P) -> Result<(), ResegmentError> {
        let path = path.as_ref();
        let collection = SubtitleCollection::new(path.to_path_buf(), outcome.cues.clone());
        collection.write_to_srt(path).map_err(|e| {
            error!("Failed to write {:?}: {}", path, e);
            ResegmentError::File(e.to_string())
        })?;
        info!("Wrote {} cues to {:?}", outcome.cues.len(), path);
        Ok(())
    }
}

fn emit(events: &Option<EventCallback>, event: JobEvent) {
    if let Some(callback) = events {
        callback(&event);
    }
}

fn read_subtitles(path: &Path) -> Result<SubtitleCollection, ResegmentError> {
    let subtitles = SubtitleCollection::from_srt_file(path)
        .map_err(|e| ResegmentError::Subtitle(format!("{:?}: {}", path, e)))?;
    if subtitles.cues.is_empty() {
        return Err(ResegmentError::Subtitle(format!("{:?} contains no cues", path)));
    }
    Ok(subtitles)
}

/// Language of the job: the explicit hint wins over the recognizer's guess
fn resolve_language(hint: &str, recognized: &str) -> String {
    let recognized = language_utils::normalize_to_part1_or_part2t(recognized).unwrap_or_else(|_| recognized.to_string());
    if hint.is_empty() || hint.eq_ignore_ascii_case("auto") {
        return if recognized.is_empty() { "auto".to_string() } else { recognized };
    }
    if !recognized.is_empty() && !language_utils::language_codes_match(hint, &recognized) {
        warn!("Recognizer reported '{}' but the job asks for '{}'", recognized, hint);
    }
    hint.to_string()
}
