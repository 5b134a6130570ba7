/*!
 * Tests for timestamp validation and repair
 */

use resegment::segmentation::{TimestampConfig, TimestampIssue, TimestampValidator};
use resegment::subtitle_processor::Cue;

fn assert_monotonic(cues: &[Cue]) {
    for (i, cue) in cues.iter().enumerate() {
        assert!(cue.start < cue.end, "cue {} has start {} >= end {}", i, cue.start, cue.end);
        if i > 0 {
            assert!(cue.start >= cues[i - 1].end, "cue {} starts before cue {} ends", i, i - 1);
        }
    }
}

#[test]
fn test_validate_scrambledInput_shouldBecomeMonotonic() {
    let cues = vec![
        Cue::new(5.0, 3.0, "backwards range here"),
        Cue::new(1.0, 2.0, "starts before the previous one"),
        Cue::new(f64::NAN, 4.0, "no start"),
        Cue::new(4.0, f64::INFINITY, "no end"),
        Cue::new(-3.0, -1.0, "negative"),
        Cue::new(10.0, 10.0, "empty range"),
    ];

    let validated = TimestampValidator::default().validate(cues);

    assert_eq!(validated.len(), 6);
    assert_monotonic(&validated);
}

#[test]
fn test_validate_cleanInput_shouldBeUnchanged() {
    let cues = vec![
        Cue::new(0.0, 2.0, "four words right here"),
        Cue::new(2.5, 4.5, "and four more here"),
    ];

    let validator = TimestampValidator::new(TimestampConfig::default());
    assert!(validator.inspect(&cues).is_clean());
    assert_eq!(validator.validate(cues.clone()), cues);
}

#[test]
fn test_validate_tooLongCue_shouldBeCapped() {
    let cues = vec![Cue::new(0.0, 30.0, "two words")];
    let validated = TimestampValidator::default().validate(cues);

    assert!((validated[0].end - 2.0).abs() < 1e-9);
}

#[test]
fn test_inspect_shouldReportEachProblem() {
    let cues = vec![
        Cue::new(0.0, 10.0, "two words"),
        Cue::new(9.0, 9.1, "one two three four"),
    ];
    let report = TimestampValidator::default().inspect(&cues);

    assert_eq!(report.cue_count, 2);
    assert_eq!(report.overlap_count(), 1);
    assert!(report.issues.iter().any(|i| matches!(i, TimestampIssue::TooLong { index: 0, .. })));
    assert!(report.issues.iter().any(|i| matches!(i, TimestampIssue::TooShort { index: 1, .. })));
}
