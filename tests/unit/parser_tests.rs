/*!
 * Tests for tolerant LLM response parsing
 */

use resegment::errors::ParseError;
use resegment::segmentation::parser::{parse, try_parse};
use resegment::segmentation::{check_integrity, Segment};

#[test]
fn test_parse_proseAroundArray_shouldExtractSegments() {
    let response = "Sure! Here is the split:\n```json\n[\"Hello there.\", \"General Kenobi.\"]\n```\nHope it helps.";
    let segments = parse(response);

    assert_eq!(segments, vec![Segment::new("Hello there."), Segment::new("General Kenobi.")]);
}

#[test]
fn test_parse_bracketsInsideStrings_shouldNotEndArray() {
    let response = r#"[{"text": "He said [quietly] \"no]\"", "word_count": 4}, {"text": "Fine."}]"#;
    let segments = parse(response);

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].text, "He said [quietly] \"no]\"");
    assert_eq!(segments[0].approx_word_count, Some(4));
    assert_eq!(segments[1].approx_word_count, None);
}

#[test]
fn test_parse_mixedEntries_shouldDropUnusableOnes() {
    let segments = parse(r#"["  one  ", 42, {"wordCount": 2}, "", {"text": "two", "wordCount": 1}]"#);

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].text, "one");
    assert_eq!(segments[1].approx_word_count, Some(1));
}

#[test]
fn test_tryParse_failures_shouldExplainWhy() {
    assert_eq!(try_parse("no array at all"), Err(ParseError::NoArray));
    assert!(matches!(try_parse("[\"unterminated\", ]"), Err(ParseError::Malformed(_))));
    assert!(parse("[\"unterminated\"").is_empty());
}

#[test]
fn test_checkIntegrity_droppedWords_shouldBeReported() {
    let segments = parse(r#"["It was late,", "so we left."]"#);
    assert!(check_integrity("It was late, so we left.", &segments, 0.95).passed);

    let shortened = parse(r#"["It was late."]"#);
    let report = check_integrity("It was late, so we left.", &shortened, 0.95);
    assert!(!report.passed);
    assert_eq!(report.expected_tokens, 6);
    assert_eq!(report.actual_tokens, 3);
}
