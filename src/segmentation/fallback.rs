/*!
 * Rule-based segmentation used when no LLM output can be trusted.
 *
 * Words are accumulated greedily into a cue which is closed when a word ends
 * a sentence, the cue reaches the maximum duration, or it reaches the maximum
 * word count. The result depends only on the input words and limits.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::subtitle_processor::Cue;
use crate::words::{join_words, Word, WordStore, DEFAULT_SENTENCE_TERMINATORS};

/// Limits for rule-based cues
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FallbackConfig {
    /// Longest cue in seconds
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: f64,

    /// Most words per cue
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

fn default_max_duration_secs() -> f64 {
    5.0
}

fn default_max_words() -> usize {
    12
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: default_max_duration_secs(),
            max_words: default_max_words(),
        }
    }
}

/// Greedy sentence/duration/count segmenter
#[derive(Debug, Clone)]
pub struct FallbackSegmenter {
    max_duration_secs: f64,
    max_words: usize,
    terminators: Vec<char>,
}

impl Default for FallbackSegmenter {
    fn default() -> Self {
        Self::new(&FallbackConfig::default())
    }
}

impl FallbackSegmenter {
    pub fn new(config: &FallbackConfig) -> Self {
        Self {
            max_duration_secs: config.max_duration_secs,
            max_words: config.max_words.max(1),
            terminators: DEFAULT_SENTENCE_TERMINATORS.to_vec(),
        }
    }

    /// Use a custom set of sentence-final characters
    pub fn with_terminators(mut self, terminators: Vec<char>) -> Self {
        if !terminators.is_empty() {
            self.terminators = terminators;
        }
        self
    }

    /// Split `words` into cues
    pub fn segment(&self, words: &[Word]) -> Vec<Cue> {
        let mut cues = Vec::new();
        let mut current_start = 0usize;

        for (i, word) in words.iter().enumerate() {
            let group = &words[current_start..=i];
            let duration = word.end - group[0].start;

            let should_split = word.ends_sentence(&self.terminators)
                || duration >= self.max_duration_secs
                || group.len() >= self.max_words;

            if should_split {
                push_cue(&mut cues, group);
                current_start = i + 1;
            }
        }

        if current_start < words.len() {
            push_cue(&mut cues, &words[current_start..]);
        }

        debug!("Rule-based split produced {} cues from {} words", cues.len(), words.len());
        cues
    }
}

fn push_cue(cues: &mut Vec<Cue>, group: &[Word]) {
    let text = join_words(group);
    if text.is_empty() {
        return;
    }
    let start = group[0].start;
    let end = group[group.len() - 1].end;
    cues.push(Cue::new(start, end, text));
}

/// Split `words` into cues with the default sentence terminators
pub fn segment(words: &WordStore, max_duration_secs: f64, max_words: usize) -> Vec<Cue> {
    FallbackSegmenter::new(&FallbackConfig {
        max_duration_secs,
        max_words,
    })
    .segment(words.words())
}
