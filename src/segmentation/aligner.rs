/*!
 * Fuzzy alignment of rewritten segments to recognized word timings.
 *
 * Each segment is tokenized and walked left to right against the word
 * sequence. Every token looks for its best candidate inside a small
 * lookahead window; candidates far from the cursor or across a long
 * silence are penalized. The end time is derived from the matched words
 * with a gap-aware rule so one stray match far ahead cannot stretch a cue
 * across a pause.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::segmentation::fuzzy::{clean_word, match_score, tokenize};
use crate::segmentation::parser::Segment;
use crate::subtitle_processor::Cue;
use crate::words::Word;

/// Tuning constants for the aligner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlignmentConfig {
    /// Number of words searched ahead of the cursor for each token
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,

    /// Minimum edit similarity for a non-exact token match
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f64,

    /// Score deducted per word of lookahead offset
    #[serde(default = "default_position_penalty")]
    pub position_penalty: f64,

    /// Silence (seconds) treated as a break between matched words
    #[serde(default = "default_continuity_gap_secs")]
    pub continuity_gap_secs: f64,

    /// Score deducted for a candidate after such a silence
    #[serde(default = "default_continuity_penalty")]
    pub continuity_penalty: f64,

    /// Combined score a candidate must exceed to be accepted
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f64,

    /// Padding added after the last word before a silence
    #[serde(default = "default_end_buffer_secs")]
    pub end_buffer_secs: f64,

    /// Span per token above which the last match is distrusted
    #[serde(default = "default_overlong_secs_per_token")]
    pub overlong_secs_per_token: f64,

    /// Padding added to the second-to-last match when the last is distrusted
    #[serde(default = "default_overlong_buffer_secs")]
    pub overlong_buffer_secs: f64,

    /// Match ratio below which the end time is estimated
    #[serde(default = "default_low_confidence_ratio")]
    pub low_confidence_ratio: f64,

    /// Assumed seconds per token when only one word matched
    #[serde(default = "default_fallback_secs_per_token")]
    pub fallback_secs_per_token: f64,

    /// Upper bound on cue duration per token
    #[serde(default = "default_max_secs_per_token")]
    pub max_secs_per_token: f64,

    /// Consecutive unmatched tokens before the word cursor slides
    #[serde(default = "default_token_stall_limit")]
    pub token_stall_limit: usize,

    /// Consecutive unaligned segments before the cursor jumps
    #[serde(default = "default_segment_stall_limit")]
    pub segment_stall_limit: usize,

    /// Smallest forced jump in words
    #[serde(default = "default_min_forced_jump")]
    pub min_forced_jump: usize,

    /// Words at the end of a span a forced jump never lands in
    #[serde(default = "default_tail_reserve")]
    pub tail_reserve: usize,
}

fn default_lookahead() -> usize { 10 }
fn default_similarity_floor() -> f64 { 0.6 }
fn default_position_penalty() -> f64 { 0.15 }
fn default_continuity_gap_secs() -> f64 { 1.5 }
fn default_continuity_penalty() -> f64 { 0.4 }
fn default_accept_threshold() -> f64 { 0.6 }
fn default_end_buffer_secs() -> f64 { 0.2 }
fn default_overlong_secs_per_token() -> f64 { 1.0 }
fn default_overlong_buffer_secs() -> f64 { 0.3 }
fn default_low_confidence_ratio() -> f64 { 0.6 }
fn default_fallback_secs_per_token() -> f64 { 0.3 }
fn default_max_secs_per_token() -> f64 { 0.8 }
fn default_token_stall_limit() -> usize { 3 }
fn default_segment_stall_limit() -> usize { 3 }
fn default_min_forced_jump() -> usize { 10 }
fn default_tail_reserve() -> usize { 10 }

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            lookahead: default_lookahead(),
            similarity_floor: default_similarity_floor(),
            position_penalty: default_position_penalty(),
            continuity_gap_secs: default_continuity_gap_secs(),
            continuity_penalty: default_continuity_penalty(),
            accept_threshold: default_accept_threshold(),
            end_buffer_secs: default_end_buffer_secs(),
            overlong_secs_per_token: default_overlong_secs_per_token(),
            overlong_buffer_secs: default_overlong_buffer_secs(),
            low_confidence_ratio: default_low_confidence_ratio(),
            fallback_secs_per_token: default_fallback_secs_per_token(),
            max_secs_per_token: default_max_secs_per_token(),
            token_stall_limit: default_token_stall_limit(),
            segment_stall_limit: default_segment_stall_limit(),
            min_forced_jump: default_min_forced_jump(),
            tail_reserve: default_tail_reserve(),
        }
    }
}

/// Timing found for one segment
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentResult {
    pub start: f64,
    pub end: f64,

    /// First word index not consumed by this segment
    pub next_word_index: usize,

    /// Matched tokens / total tokens
    pub match_ratio: f64,

    pub matched_words: usize,

    /// Whether the end time was estimated rather than observed
    pub low_confidence: bool,
}

/// A segment that found its place in the word timeline
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSegment {
    /// Position of the segment in the input list
    pub segment_index: usize,
    pub text: String,
    pub result: AlignmentResult,
}

impl AlignedSegment {
    pub fn to_cue(&self) -> Cue {
        Cue::new(self.result.start, self.result.end, self.text.clone())
    }
}

/// Outcome of aligning a list of segments against a word span
#[derive(Debug, Clone, Default)]
pub struct AlignmentRun {
    pub aligned: Vec<AlignedSegment>,

    /// Indices of segments that matched no word at all
    pub unaligned: Vec<usize>,

    /// Word cursor after the last segment
    pub next_word_index: usize,
}

impl AlignmentRun {
    /// Aligned segments as cues, in segment order
    pub fn cues(&self) -> Vec<Cue> {
        self.aligned.iter().map(AlignedSegment::to_cue).collect()
    }

    pub fn low_confidence_count(&self) -> usize {
        self.aligned.iter().filter(|s| s.result.low_confidence).count()
    }

    /// Aligned segments / all segments; 0.0 for an empty run
    pub fn alignment_rate(&self) -> f64 {
        let total = self.aligned.len() + self.unaligned.len();
        if total == 0 {
            return 0.0;
        }
        self.aligned.len() as f64 / total as f64
    }
}

/// Stateless segment-to-word aligner
#[derive(Debug, Clone, Default)]
pub struct Aligner {
    config: AlignmentConfig,
}

impl Aligner {
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Align one segment starting at `start_index`.
    ///
    /// Returns `None` when no token matched any word.
    pub fn align(&self, segment: &Segment, words: &[Word], start_index: usize) -> Option<AlignmentResult> {
        self.align_guided(segment, words, start_index, None)
    }

    /// Align one segment, sliding the cursor toward `expected_end` when tokens stall
    pub fn align_guided(
        &self,
        segment: &Segment,
        words: &[Word],
        start_index: usize,
        expected_end: Option<usize>,
    ) -> Option<AlignmentResult> {
        let cfg = &self.config;
        let tokens = tokenize(&segment.text);
        if tokens.is_empty() || start_index >= words.len() {
            return None;
        }

        let mut matched: Vec<usize> = Vec::new();
        let mut cursor = start_index;
        let mut stalled = 0usize;

        for (t_i, token) in tokens.iter().enumerate() {
            if cursor >= words.len() {
                break;
            }

            let window_end = (cursor + cfg.lookahead).min(words.len());
            let mut best: Option<(usize, f64)> = None;

            for (offset, index) in (cursor..window_end).enumerate() {
                let word_text = clean_word(&words[index].text);
                if word_text.is_empty() {
                    continue;
                }

                let mut score = match_score(token, &word_text, cfg.similarity_floor);
                score -= offset as f64 * cfg.position_penalty;

                if offset > 0 {
                    if let Some(&prev) = matched.last() {
                        let gap = words[index].start - words[prev].end;
                        if gap > cfg.continuity_gap_secs {
                            score -= cfg.continuity_penalty;
                        }
                    }
                }

                if score > best.map_or(0.0, |(_, s)| s) {
                    best = Some((index, score));
                }
            }

            match best {
                Some((index, score)) if score > cfg.accept_threshold => {
                    matched.push(index);
                    cursor = index + 1;
                    stalled = 0;
                }
                _ => {
                    stalled += 1;
                    if stalled >= cfg.token_stall_limit
                        && !self.window_has_candidate(&tokens[t_i + 1..], &words[cursor..window_end])
                    {
                        let step = stall_step(cursor, expected_end, t_i, tokens.len(), cfg.lookahead);
                        cursor = (cursor + step).min(words.len());
                        debug!("Token stall at '{}', word cursor slides to {}", token, cursor);
                        stalled = 0;
                    }
                }
            }
        }

        let &last = matched.last()?;
        let matched_count = matched.len();

        // Punctuation-only words right after the last match belong to it
        let mut timeline = matched.clone();
        let mut next_index = cursor.max(last + 1);
        let mut tail = last;
        while next_index < words.len()
            && clean_word(&words[next_index].text).is_empty()
            && words[next_index].start - words[tail].end <= cfg.continuity_gap_secs
        {
            timeline.push(next_index);
            tail = next_index;
            next_index += 1;
        }

        let timed: Vec<&Word> = timeline.iter().map(|&i| &words[i]).collect();
        let start = timed[0].start;
        let (mut end, cut_at_gap) = self.robust_end(&timed, tokens.len());

        let match_ratio = matched_count as f64 / tokens.len() as f64;
        let low_confidence = match_ratio < cfg.low_confidence_ratio;
        if low_confidence && matched_count == 1 {
            end = start + tokens.len() as f64 * cfg.fallback_secs_per_token;
        } else if low_confidence && !cut_at_gap {
            // Unmatched tokens are timed at the average pace of the matched ones
            let first = &words[matched[0]];
            let last_word = &words[last];
            let average = (last_word.end - first.start) / matched_count as f64;
            end = start + average * tokens.len() as f64;
        }

        let ceiling = tokens.len() as f64 * cfg.max_secs_per_token;
        if end - start > ceiling {
            end = start + ceiling;
        }
        if end <= start {
            end = start + cfg.fallback_secs_per_token;
        }

        Some(AlignmentResult {
            start,
            end,
            next_word_index: next_index,
            match_ratio,
            matched_words: matched_count,
            low_confidence,
        })
    }

    /// End time that never reaches across a silence between matched words.
    ///
    /// The flag is set when the end was cut at such a silence.
    fn robust_end(&self, timed: &[&Word], token_count: usize) -> (f64, bool) {
        let cfg = &self.config;
        let last = timed[timed.len() - 1];
        if timed.len() == 1 {
            return (last.end, false);
        }

        for pair in timed.windows(2) {
            if pair[1].start - pair[0].end > cfg.continuity_gap_secs {
                return (pair[0].end + cfg.end_buffer_secs, true);
            }
        }

        let span = last.end - timed[0].start;
        if span > token_count as f64 * cfg.overlong_secs_per_token {
            return (timed[timed.len() - 2].end + cfg.overlong_buffer_secs, false);
        }

        (last.end, false)
    }

    /// Whether any of `tokens` would be accepted for a word in `window`
    fn window_has_candidate(&self, tokens: &[String], window: &[Word]) -> bool {
        let cfg = &self.config;
        window.iter().any(|word| {
            let word_text = clean_word(&word.text);
            !word_text.is_empty()
                && tokens
                    .iter()
                    .any(|token| match_score(token, &word_text, cfg.similarity_floor) > cfg.accept_threshold)
        })
    }

    /// Align `segments` in order over the words in `span`.
    ///
    /// `words` may extend past `span.end`; only `span` is searched. After
    /// several consecutive unaligned segments the cursor jumps to the
    /// proportional position of the next segment.
    pub fn align_all(&self, segments: &[Segment], words: &[Word], span: Range<usize>) -> AlignmentRun {
        let cfg = &self.config;
        let hi = span.end.min(words.len());
        let lo = span.start.min(hi);
        let view = &words[..hi];

        let token_counts: Vec<usize> = segments.iter().map(|s| tokenize(&s.text).len()).collect();
        let total_tokens: usize = token_counts.iter().sum();

        let mut run = AlignmentRun {
            next_word_index: lo,
            ..Default::default()
        };
        let mut cursor = lo;
        let mut tokens_seen = 0usize;
        let mut skipped = 0usize;

        for (i, segment) in segments.iter().enumerate() {
            tokens_seen += token_counts[i];
            let expected_end = if total_tokens > 0 {
                Some(lo + (hi - lo) * tokens_seen / total_tokens)
            } else {
                None
            };

            match self.align_guided(segment, view, cursor, expected_end) {
                Some(result) => {
                    cursor = result.next_word_index;
                    skipped = 0;
                    if result.low_confidence {
                        debug!(
                            "Low-confidence alignment ({:.0}%) for segment {}: {}",
                            result.match_ratio * 100.0,
                            i + 1,
                            segment.text
                        );
                    }
                    run.aligned.push(AlignedSegment {
                        segment_index: i,
                        text: segment.text.clone(),
                        result,
                    });
                }
                None => {
                    skipped += 1;
                    run.unaligned.push(i);
                    warn!("Segment {} could not be aligned at word {}/{}: {}", i + 1, cursor, hi, segment.text);

                    let limit = hi.saturating_sub(cfg.tail_reserve);
                    if skipped >= cfg.segment_stall_limit && cursor < limit {
                        let target = lo + (hi - lo) * (i + 1) / segments.len();
                        let jump = target.saturating_sub(cursor).max(cfg.min_forced_jump);
                        cursor = (cursor + jump).min(limit);
                        debug!("Forcing word cursor to {} after {} unaligned segments", cursor, skipped);
                        skipped = 0;
                    }
                }
            }
        }

        run.next_word_index = cursor;
        run
    }
}

/// Words to slide after a token stall
fn stall_step(cursor: usize, expected_end: Option<usize>, token_index: usize, token_count: usize, lookahead: usize) -> usize {
    match expected_end {
        Some(expected) if expected > cursor => {
            let progress = (token_index + 1) as f64 / token_count as f64;
            let step = ((expected - cursor) as f64 * progress).ceil() as usize;
            step.clamp(1, lookahead.max(1))
        }
        _ => 1,
    }
}
