/*!
 * Chunk planning for long transcripts.
 *
 * Long word sequences are split into bounded chunks so each LLM call stays
 * within context limits. Chunks are built from whole sentences; a sentence
 * longer than the limit becomes a chunk of its own. The word ranges of a
 * plan always partition the word store.
 */

use log::debug;
use std::ops::Range;

use crate::words::{token_spans, Word, DEFAULT_SENTENCE_TERMINATORS};

/// How far (in reference tokens) a proportional cut may move to reach a sentence end
const SNAP_WINDOW: usize = 8;

/// One unit of LLM work
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,

    /// Word indices covered by the chunk
    pub words: Range<usize>,

    /// Token indices of the target text covered by the chunk
    pub text_range: Range<usize>,

    /// Target text sent to the LLM
    pub text: String,
}

impl Chunk {
    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// Ordered chunks of one job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
}

impl ChunkPlan {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// Whether the word ranges cover `0..word_count` without gaps or overlaps
    pub fn is_partition(&self, word_count: usize) -> bool {
        let mut expected = 0;
        for chunk in &self.chunks {
            if chunk.words.start != expected || chunk.words.end <= chunk.words.start {
                return false;
            }
            expected = chunk.words.end;
        }
        expected == word_count
    }
}

impl<'a> IntoIterator for &'a ChunkPlan {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

/// Sentence-aware chunk planner
#[derive(Debug, Clone)]
pub struct ChunkPlanner {
    terminators: Vec<char>,
}

impl Default for ChunkPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_SENTENCE_TERMINATORS.to_vec())
    }
}

impl ChunkPlanner {
    pub fn new(terminators: Vec<char>) -> Self {
        let terminators = if terminators.is_empty() {
            DEFAULT_SENTENCE_TERMINATORS.to_vec()
        } else {
            terminators
        };
        Self { terminators }
    }

    fn ends_sentence(&self, text: &str) -> bool {
        text.trim_end()
            .trim_end_matches(['"', '\'', '”', '’', ')', '）', '」', '』'])
            .chars()
            .last()
            .is_some_and(|c| self.terminators.contains(&c))
    }

    /// Word ranges of consecutive sentences
    pub fn sentence_ranges(&self, words: &[Word]) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;
        for (i, word) in words.iter().enumerate() {
            if self.ends_sentence(&word.text) {
                ranges.push(start..i + 1);
                start = i + 1;
            }
        }
        if start < words.len() {
            ranges.push(start..words.len());
        }
        ranges
    }

    /// Group whole sentences into word ranges of at most `max_chunk_size` words
    fn word_ranges(&self, words: &[Word], max_chunk_size: usize) -> Vec<Range<usize>> {
        let max = max_chunk_size.max(1);
        let n = words.len();
        if n == 0 {
            return Vec::new();
        }
        if n <= max {
            return vec![0..n];
        }

        let mut ranges = Vec::new();
        let mut current: Option<Range<usize>> = None;

        for sentence in self.sentence_ranges(words) {
            if sentence.len() > max {
                if let Some(open) = current.take() {
                    ranges.push(open);
                }
                debug!("Sentence of {} words exceeds chunk size {}, keeping it whole", sentence.len(), max);
                ranges.push(sentence);
                continue;
            }

            current = match current.take() {
                Some(open) if open.len() + sentence.len() > max => {
                    ranges.push(open);
                    Some(sentence)
                }
                Some(open) => Some(open.start..sentence.end),
                None => Some(sentence),
            };
        }
        if let Some(open) = current {
            ranges.push(open);
        }
        ranges
    }

    /// Plan chunks whose text is the recognized transcript itself
    pub fn plan(&self, words: &[Word], max_chunk_size: usize) -> ChunkPlan {
        let chunks = self
            .word_ranges(words, max_chunk_size)
            .into_iter()
            .enumerate()
            .map(|(index, range)| Chunk {
                index,
                text: crate::words::join_words(&words[range.clone()]),
                text_range: range.clone(),
                words: range,
            })
            .collect::<Vec<_>>();

        debug!("Planned {} chunks for {} words", chunks.len(), words.len());
        ChunkPlan { chunks }
    }

    /// Plan chunks carrying slices of `reference` as their target text.
    ///
    /// Reference tokens are cut proportionally to the word ranges and each
    /// cut is moved to the nearest sentence end within a small window.
    pub fn plan_with_reference(&self, words: &[Word], reference: &str, max_chunk_size: usize) -> ChunkPlan {
        let ranges = self.word_ranges(words, max_chunk_size);
        let spans = token_spans(reference);
        let token_count = spans.len();
        let word_count = words.len();

        let mut cuts = Vec::with_capacity(ranges.len() + 1);
        cuts.push(0usize);
        for range in ranges.iter().take(ranges.len().saturating_sub(1)) {
            let proportional = (range.end as f64 * token_count as f64 / word_count as f64).round() as usize;
            let previous = cuts[cuts.len() - 1];
            let snapped = self.snap_to_sentence_end(reference, &spans, proportional, previous);
            cuts.push(snapped.clamp(previous, token_count));
        }
        cuts.push(token_count);

        let chunks = ranges
            .into_iter()
            .enumerate()
            .map(|(index, range)| {
                let (from, to) = (cuts[index], cuts[index + 1]);
                let text = if from < to {
                    reference[spans[from].start..spans[to - 1].end].trim().to_string()
                } else {
                    String::new()
                };
                Chunk {
                    index,
                    words: range,
                    text_range: from..to,
                    text,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            "Planned {} chunks for {} words against {} reference tokens",
            chunks.len(),
            word_count,
            token_count
        );
        ChunkPlan { chunks }
    }

    /// Nearest cut in `cut ± SNAP_WINDOW` that follows a sentence-final token
    fn snap_to_sentence_end(&self, reference: &str, spans: &[Range<usize>], cut: usize, floor: usize) -> usize {
        let token_count = spans.len();
        let cut = cut.clamp(floor, token_count);

        for distance in 0..=SNAP_WINDOW {
            let candidates = [cut.checked_sub(distance), cut.checked_add(distance)];
            for candidate in candidates.into_iter().flatten() {
                if candidate <= floor || candidate > token_count {
                    continue;
                }
                if self.ends_sentence(&reference[spans[candidate - 1].clone()]) {
                    return candidate;
                }
            }
        }
        cut
    }
}

/// Split free text after sentence-final punctuation
pub fn split_sentences(text: &str, terminators: &[char]) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if !terminators.contains(&c) {
            continue;
        }
        // keep runs like "?!" and closing quotes with the sentence
        while let Some(&next) = chars.peek() {
            if terminators.contains(&next) || matches!(next, '"' | '\'' | '”' | '’' | ')' | '）' | '」') {
                current.push(next);
                chars.next();
            } else {
                break;
            }
        }
        let sentence = current.trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        current.clear();
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words_from(text: &str) -> Vec<Word> {
        text.split_whitespace()
            .enumerate()
            .map(|(i, t)| Word::new(t, i as f64 * 0.5, i as f64 * 0.5 + 0.4))
            .collect()
    }

    #[test]
    fn test_plan_empty_shouldHaveNoChunks() {
        let plan = ChunkPlanner::default().plan(&[], 10);
        assert!(plan.is_empty());
        assert!(plan.is_partition(0));
    }

    #[test]
    fn test_plan_underLimit_shouldBeSingleChunk() {
        let words = words_from("One two. Three four.");
        let plan = ChunkPlanner::default().plan(&words, 10);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.chunks[0].words, 0..4);
        assert_eq!(plan.chunks[0].text, "One two. Three four.");
    }

    #[test]
    fn test_plan_shouldPackWholeSentences() {
        let words = words_from("a b c. d e. f g h i. j k.");
        let plan = ChunkPlanner::default().plan(&words, 5);

        let ranges: Vec<_> = plan.iter().map(|c| c.words.clone()).collect();
        assert_eq!(ranges, vec![0..5, 5..9, 9..11]);
        assert!(plan.is_partition(words.len()));
        assert_eq!(plan.chunks[1].text, "f g h i.");
    }

    #[test]
    fn test_plan_oversizedSentence_shouldStandAlone() {
        let words = words_from("a b. c d e f g h i j. k.");
        let plan = ChunkPlanner::default().plan(&words, 3);

        let ranges: Vec<_> = plan.iter().map(|c| c.words.clone()).collect();
        assert_eq!(ranges, vec![0..2, 2..10, 10..11]);
    }

    #[test]
    fn test_plan_noPunctuation_shouldStillPartition() {
        let words = words_from("a b c d e f g h");
        for max in [0, 1, 3, 7, 8, 100] {
            let plan = ChunkPlanner::default().plan(&words, max);
            assert!(plan.is_partition(words.len()), "max {}", max);
        }
    }

    #[test]
    fn test_plan_manySizes_shouldAlwaysPartition() {
        let words = words_from("It was late. We left! Did you see it? Yes. The end of a long story came. ok");
        for max in 1..=words.len() + 1 {
            let plan = ChunkPlanner::default().plan(&words, max);
            assert!(plan.is_partition(words.len()), "max {}", max);
            for (i, chunk) in plan.iter().enumerate() {
                assert_eq!(chunk.index, i);
            }
        }
    }

    #[test]
    fn test_planWithReference_shouldPartitionReferenceTokens() {
        let words = words_from("a b c. d e f. g h i.");
        let reference = "A b c. D e f. G h i.";
        let plan = ChunkPlanner::default().plan_with_reference(&words, reference, 4);

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.chunks[0].text, "A b c.");
        assert_eq!(plan.chunks[1].text, "D e f.");
        assert_eq!(plan.chunks[2].text_range, 6..9);
        assert_eq!(plan.chunks[2].text, "G h i.");
    }

    #[test]
    fn test_planWithReference_shouldSnapToNearbySentenceEnd() {
        let words = words_from("a b c. d e f.");
        // reference has extra words so the proportional cut lands mid-sentence
        let reference = "a b c. d e f g h i.";
        let plan = ChunkPlanner::default().plan_with_reference(&words, reference, 3);

        assert_eq!(plan.chunks[0].text, "a b c.");
        assert_eq!(plan.chunks[0].text_range, 0..3);
        assert_eq!(plan.chunks[1].text, "d e f g h i.");
    }

    #[test]
    fn test_splitSentences_shouldKeepTerminatorRuns() {
        let sentences = split_sentences("Really?! Yes. \"Go.\" 好的。还有", DEFAULT_SENTENCE_TERMINATORS);
        assert_eq!(sentences, vec!["Really?!", "Yes.", "\"Go.\"", "好的。", "还有"]);
    }
}
