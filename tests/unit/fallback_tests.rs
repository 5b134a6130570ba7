/*!
 * Tests for the rule-based segmenter
 */

use resegment::segmentation::fallback::{self, FallbackConfig, FallbackSegmenter};
use resegment::words::{Word, WordStore};
use crate::common;

#[test]
fn test_segment_scenarioC_shouldSplitAtSentenceBoundary() {
    let words = WordStore::new(common::words_from("This is a test. It has two sentences.", 0.4));
    let cues = fallback::segment(&words, 5.0, 100);

    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0].text, "This is a test.");
    assert_eq!(cues[1].text, "It has two sentences.");
}

#[test]
fn test_segment_sameInput_shouldBeDeterministic() {
    let words = common::words_from(common::SAMPLE_TRANSCRIPT, 0.7);
    let segmenter = FallbackSegmenter::new(&FallbackConfig::default());

    assert_eq!(segmenter.segment(&words), segmenter.segment(&words));
}

#[test]
fn test_segment_shouldCoverEveryWordOnce() {
    let words = common::words_from(common::SAMPLE_TRANSCRIPT, 0.9);
    let cues = FallbackSegmenter::new(&FallbackConfig { max_duration_secs: 2.0, max_words: 3 }).segment(&words);

    let rejoined: Vec<&str> = cues.iter().flat_map(|c| c.text.split_whitespace()).collect();
    let original: Vec<&str> = common::SAMPLE_TRANSCRIPT.split_whitespace().collect();
    assert_eq!(rejoined, original);
    for cue in &cues {
        assert!(cue.word_count() <= 3);
    }
}

#[test]
fn test_segment_longPause_shouldSplitOnDuration() {
    let words = vec![
        Word::new("one", 0.0, 0.5),
        Word::new("two", 0.5, 1.0),
        Word::new("three", 6.0, 6.5),
        Word::new("four", 6.5, 7.0),
    ];
    let cues = FallbackSegmenter::new(&FallbackConfig::default()).segment(&words);

    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0].text, "one two three");
    assert_eq!(cues[1].text, "four");
}

#[test]
fn test_segment_empty_shouldYieldNoCues() {
    assert!(fallback::segment(&WordStore::default(), 5.0, 12).is_empty());
}
