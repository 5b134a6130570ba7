/*!
 * Tests for chunk planning over long transcripts
 */

use resegment::segmentation::ChunkPlanner;
use resegment::words::Word;
use crate::common;

/// A long transcript with sentences of varying length
fn long_transcript() -> Vec<Word> {
    let mut text = String::new();
    for i in 0..120 {
        let length = 1 + (i * 7) % 23;
        for j in 0..length {
            text.push_str(&format!("w{}_{}", i, j));
            text.push(if j + 1 == length { '.' } else { ' ' });
            text.push(' ');
        }
    }
    common::words_from(&text, 0.3)
}

#[test]
fn test_plan_longTranscript_shouldPartitionForEverySize() {
    let words = long_transcript();
    let planner = ChunkPlanner::default();

    for max in [1, 5, 22, 23, 50, 100, 500, 5000] {
        let plan = planner.plan(&words, max);
        assert!(plan.is_partition(words.len()), "max {}", max);

        for chunk in &plan {
            // only a single oversized sentence may exceed the limit
            if chunk.word_count() > max {
                assert_eq!(planner.sentence_ranges(&words[chunk.words.clone()]).len(), 1);
            }
        }
    }
}

#[test]
fn test_plan_chunksShouldEndOnSentenceBoundaries() {
    let words = long_transcript();
    let plan = ChunkPlanner::default().plan(&words, 60);

    for chunk in &plan {
        let last = &words[chunk.words.end - 1];
        assert!(last.text.ends_with('.'), "chunk {} ends with {}", chunk.index, last.text);
    }
}

#[test]
fn test_planWithReference_textRangesShouldPartitionReference() {
    let words = long_transcript();
    let reference: String = words.iter().map(|w| w.text.to_uppercase()).collect::<Vec<_>>().join(" ");
    let plan = ChunkPlanner::default().plan_with_reference(&words, &reference, 80);

    let mut expected = 0;
    for chunk in &plan {
        assert_eq!(chunk.text_range.start, expected);
        expected = chunk.text_range.end;
    }
    assert_eq!(expected, words.len());
    assert!(plan.is_partition(words.len()));
}
