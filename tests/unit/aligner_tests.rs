/*!
 * Tests for fuzzy alignment of segments onto word timings
 */

use resegment::segmentation::fuzzy::{match_score, similarity, tokenize};
use resegment::segmentation::{Aligner, AlignmentConfig, Segment};
use resegment::words::Word;
use crate::common;

fn words(timings: &[(&str, f64, f64)]) -> Vec<Word> {
    timings.iter().map(|(t, s, e)| Word::new(*t, *s, *e)).collect()
}

#[test]
fn test_align_scenarioA_shouldCoverTrailingPunctuation() {
    let words = words(&[("I", 0.0, 0.3), ("love", 0.3, 0.6), ("cats", 0.6, 1.0), (".", 1.0, 1.1)]);
    let result = Aligner::default()
        .align(&Segment::new("I love cats."), &words, 0)
        .expect("segment should align");

    assert_eq!(result.start, 0.0);
    assert!((result.end - 1.1).abs() < 1e-9);
    assert_eq!(result.match_ratio, 1.0);
    assert!(!result.low_confidence);
}

#[test]
fn test_align_scenarioB_shouldStopBeforeLongSilence() {
    let words = words(&[("hello", 0.0, 0.5), ("world", 0.5, 1.0), ("foo", 30.0, 30.4)]);
    let result = Aligner::default()
        .align(&Segment::new("hello world foo"), &words, 0)
        .expect("segment should align");

    assert_eq!(result.start, 0.0);
    assert!(result.end >= 1.0 && result.end <= 1.3, "end was {}", result.end);
}

#[test]
fn test_align_recognitionErrors_shouldStillMatch() {
    let words = words(&[("the", 0.0, 0.2), ("colour", 0.2, 0.6), ("of", 0.6, 0.7), ("magic", 0.7, 1.2)]);
    let result = Aligner::default()
        .align(&Segment::new("The color of magic"), &words, 0)
        .expect("segment should align");

    assert_eq!(result.matched_words, 4);
    assert_eq!(result.next_word_index, 4);
}

#[test]
fn test_align_nothingMatches_shouldBeNone() {
    let words = words(&[("alpha", 0.0, 0.5), ("beta", 0.5, 1.0)]);
    assert!(Aligner::default().align(&Segment::new("zzz qqq"), &words, 0).is_none());
    assert!(Aligner::default().align(&Segment::new("alpha"), &words, 2).is_none());
}

#[test]
fn test_alignAll_sequentialSegments_shouldBeTimeContinuous() {
    let words = common::words_from(common::SAMPLE_TRANSCRIPT, 0.5);
    let segments = vec![
        Segment::new("The quick brown fox jumps."),
        Segment::new("It was late so we left."),
        Segment::new("We all went home."),
    ];

    let run = Aligner::new(AlignmentConfig::default()).align_all(&segments, &words, 0..words.len());

    assert_eq!(run.aligned.len(), 3);
    assert!(run.unaligned.is_empty());
    assert_eq!(run.next_word_index, words.len());
    assert_eq!(run.alignment_rate(), 1.0);
    for pair in run.aligned.windows(2) {
        assert!(pair[1].result.start >= pair[0].result.start);
        assert!(pair[0].result.end <= pair[1].result.start + 1e-9);
    }
}

#[test]
fn test_alignAll_emptyRun_shouldHaveZeroRate() {
    let run = Aligner::default().align_all(&[], &[], 0..0);
    assert_eq!(run.alignment_rate(), 0.0);
    assert!(run.cues().is_empty());
}

#[test]
fn test_fuzzy_helpers_shouldScoreAsDocumented() {
    assert_eq!(tokenize("Don't stop, well-known!"), vec!["dont", "stop", "well-known"]);
    assert_eq!(similarity("kitten", "kitten"), 1.0);
    assert_eq!(match_score("cats", "cats", 0.6), 1.0);
    assert_eq!(match_score("dog", "elephant", 0.6), 0.0);
}

#[test]
fn test_alignAll_longTranscript_shouldStayLinear() {
    let words: Vec<Word> = (0..20_000)
        .map(|i| Word::new(format!("word{}", i), i as f64 * 0.3, i as f64 * 0.3 + 0.25))
        .collect();
    let segments: Vec<Segment> = words
        .chunks(10)
        .map(|group| Segment::new(group.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ")))
        .collect();

    let started = std::time::Instant::now();
    let run = Aligner::default().align_all(&segments, &words, 0..words.len());

    assert_eq!(run.aligned.len(), 2_000);
    assert_eq!(run.next_word_index, words.len());
    assert!(started.elapsed() < std::time::Duration::from_secs(10), "took {:?}", started.elapsed());
}
