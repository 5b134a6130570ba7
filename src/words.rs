/*!
 * Recognized words and the immutable word store a job aligns against.
 */

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::subtitle_processor::Cue;

/// Shortest duration a word may have after repair
const MIN_WORD_DURATION: f64 = 0.01;

/// Sentence-final punctuation used when nothing else is configured
pub const DEFAULT_SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？'];

/// One recognized word with its timing in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl Word {
    /// Create a word, nudging `end` forward if the recognizer gave `end <= start`
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        let start = if start.is_finite() { start.max(0.0) } else { 0.0 };
        let end = if end.is_finite() && end > start { end } else { start + MIN_WORD_DURATION };
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the word's trimmed text ends with one of `terminators`
    pub fn ends_sentence(&self, terminators: &[char]) -> bool {
        self.text
            .trim_end()
            .chars()
            .last()
            .is_some_and(|c| terminators.contains(&c))
    }
}

/// Ordered, read-only sequence of recognized words
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordStore {
    words: Vec<Word>,
}

impl WordStore {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Word> {
        self.words.get(index)
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Word> {
        self.words.iter()
    }

    /// Words in `range`, clamped to the store
    pub fn slice(&self, range: Range<usize>) -> &[Word] {
        let end = range.end.min(self.words.len());
        let start = range.start.min(end);
        &self.words[start..end]
    }

    /// Full transcript text
    pub fn text(&self) -> String {
        join_words(&self.words)
    }

    /// Build synthetic word timings from existing cues.
    ///
    /// Each cue's span is shared between its words proportionally to their
    /// character length. Unspaced scripts are split per character.
    pub fn from_cues(cues: &[Cue]) -> Self {
        let mut words = Vec::new();

        for cue in cues {
            let tokens: Vec<&str> = token_spans(&cue.text)
                .into_iter()
                .map(|span| &cue.text[span])
                .collect();

            let total_chars: usize = tokens.iter().map(|t| t.chars().count()).sum();
            if total_chars == 0 {
                continue;
            }

            let span = (cue.end - cue.start).max(MIN_WORD_DURATION * tokens.len() as f64);
            let mut consumed = 0usize;
            for token in tokens {
                let chars = token.chars().count();
                let start = cue.start + span * consumed as f64 / total_chars as f64;
                consumed += chars;
                let end = cue.start + span * consumed as f64 / total_chars as f64;
                words.push(Word::new(token, start, end));
            }
        }

        Self { words }
    }
}

impl From<Vec<Word>> for WordStore {
    fn from(words: Vec<Word>) -> Self {
        Self::new(words)
    }
}

/// Whether `c` belongs to a script written without inter-word spaces
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303F}'   // CJK punctuation
        | '\u{3040}'..='\u{30FF}' // kana
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF00}'..='\u{FFEF}' // full-width forms
    )
}

/// Byte ranges of the tokens in `text`.
///
/// Tokens are whitespace separated; in unspaced scripts every character is
/// its own token, with following punctuation kept attached to it.
pub fn token_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut current: Option<usize> = None;
    let mut prev_cjk = false;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(start) = current.take() {
                spans.push(start..i);
            }
            prev_cjk = false;
            continue;
        }

        let ideograph = is_cjk(c) && !is_cjk_punctuation(c);
        let punctuation = is_cjk_punctuation(c) || c.is_ascii_punctuation();
        let starts_token = ideograph || (prev_cjk && !punctuation);
        if starts_token {
            if let Some(start) = current.take() {
                spans.push(start..i);
            }
        }
        if current.is_none() {
            current = Some(i);
        }
        prev_cjk = is_cjk(c) || is_cjk_punctuation(c);
    }

    if let Some(start) = current {
        spans.push(start..text.len());
    }
    spans
}

/// Full-width and ideographic punctuation
pub fn is_cjk_punctuation(c: char) -> bool {
    matches!(c, '\u{3000}'..='\u{303F}' | '！' | '？' | '，' | '：' | '；' | '（' | '）' | '“' | '”' | '‘' | '’' | '…')
}

/// Join word texts into readable text.
///
/// Recognizers that attach a leading space to each word are concatenated
/// as-is. Otherwise words are space separated, except around CJK characters
/// and before punctuation-only tokens.
pub fn join_words(words: &[Word]) -> String {
    let mut out = String::new();

    for word in words {
        let text = word.text.as_str();
        if text.trim().is_empty() {
            continue;
        }

        if out.is_empty() || text.starts_with(char::is_whitespace) {
            out.push_str(text);
            continue;
        }

        let prev = out.chars().last();
        let next = text.chars().next();
        let glue = match (prev, next) {
            (Some(p), Some(n)) => {
                p.is_whitespace()
                    || is_cjk(p)
                    || is_cjk(n)
                    || text.chars().all(|c| c.is_ascii_punctuation())
            }
            _ => true,
        };
        if !glue {
            out.push(' ');
        }
        out.push_str(text);
    }

    out.trim().to_string()
}
