/*!
 * Timestamp validation and repair for aligned cues.
 *
 * The validator runs once per job over the concatenated cue list and
 * guarantees:
 * - every cue ends after it starts
 * - no cue overlaps the one before it
 * - durations stay within a plausible speaking-rate band
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::subtitle_processor::Cue;

/// Rates and fixes used by the validator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimestampConfig {
    /// Duration given to a cue whose end is not after its start
    #[serde(default = "default_invalid_range_fix_secs")]
    pub invalid_range_fix_secs: f64,

    /// Gap inserted after the previous cue when two overlap
    #[serde(default = "default_overlap_gap_secs")]
    pub overlap_gap_secs: f64,

    /// Fastest plausible speech, seconds per word
    #[serde(default = "default_min_secs_per_word")]
    pub min_secs_per_word: f64,

    /// Slowest plausible speech, seconds per word
    #[serde(default = "default_max_secs_per_word")]
    pub max_secs_per_word: f64,

    /// Short cues are only stretched when below this duration
    #[serde(default = "default_min_duration_floor_secs")]
    pub min_duration_floor_secs: f64,
}

fn default_invalid_range_fix_secs() -> f64 { 1.0 }
fn default_overlap_gap_secs() -> f64 { 0.1 }
fn default_min_secs_per_word() -> f64 { 0.25 }
fn default_max_secs_per_word() -> f64 { 1.0 }
fn default_min_duration_floor_secs() -> f64 { 0.5 }

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            invalid_range_fix_secs: default_invalid_range_fix_secs(),
            overlap_gap_secs: default_overlap_gap_secs(),
            min_secs_per_word: default_min_secs_per_word(),
            max_secs_per_word: default_max_secs_per_word(),
            min_duration_floor_secs: default_min_duration_floor_secs(),
        }
    }
}

/// Problem found in a cue list
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampIssue {
    /// Start is not before end
    InvalidRange {
        index: usize,
        start: f64,
        end: f64,
    },
    /// Starts before the previous cue ends
    Overlap {
        index: usize,
        overlap_secs: f64,
    },
    /// Shorter than the word count allows
    TooShort {
        index: usize,
        duration: f64,
        min_duration: f64,
    },
    /// Longer than the word count allows
    TooLong {
        index: usize,
        duration: f64,
        max_duration: f64,
    },
}

impl std::fmt::Display for TimestampIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimestampIssue::InvalidRange { index, start, end } => {
                write!(f, "Cue {}: invalid time range {:.3}s -> {:.3}s", index + 1, start, end)
            }
            TimestampIssue::Overlap { index, overlap_secs } => {
                write!(f, "Cue {}: overlaps previous cue by {:.3}s", index + 1, overlap_secs)
            }
            TimestampIssue::TooShort { index, duration, min_duration } => {
                write!(
                    f,
                    "Cue {}: duration too short: {:.2}s (min: {:.2}s)",
                    index + 1, duration, min_duration
                )
            }
            TimestampIssue::TooLong { index, duration, max_duration } => {
                write!(
                    f,
                    "Cue {}: duration too long: {:.2}s (max: {:.2}s)",
                    index + 1, duration, max_duration
                )
            }
        }
    }
}

/// Issues found by [`TimestampValidator::inspect`]
#[derive(Debug, Clone, Default)]
pub struct TimestampReport {
    pub issues: Vec<TimestampIssue>,
    pub cue_count: usize,
}

impl TimestampReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn overlap_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, TimestampIssue::Overlap { .. }))
            .count()
    }
}

/// Validator that repairs cue timing in place
#[derive(Debug, Clone, Default)]
pub struct TimestampValidator {
    config: TimestampConfig,
}

impl TimestampValidator {
    pub fn new(config: TimestampConfig) -> Self {
        Self { config }
    }

    /// Duration band allowed for `word_count` words
    fn band(&self, word_count: usize) -> (f64, f64) {
        let wc = word_count as f64;
        (wc * self.config.min_secs_per_word, wc * self.config.max_secs_per_word)
    }

    /// Repair `cues` so they are ordered, non-overlapping and plausibly timed
    pub fn validate(&self, cues: Vec<Cue>) -> Vec<Cue> {
        let cfg = &self.config;
        let mut validated: Vec<Cue> = Vec::with_capacity(cues.len());

        for (i, mut cue) in cues.into_iter().enumerate() {
            let prev_end = validated.last().map(|c| c.end);

            if !cue.start.is_finite() || cue.start < 0.0 {
                cue.start = prev_end.unwrap_or(0.0);
            }
            if !cue.end.is_finite() {
                cue.end = cue.start;
            }

            if cue.start >= cue.end {
                cue.end = cue.start + cfg.invalid_range_fix_secs;
            }

            if let Some(prev_end) = prev_end {
                if cue.start < prev_end {
                    debug!("Cue {} overlaps previous by {:.3}s", i + 1, prev_end - cue.start);
                    cue.start = prev_end + cfg.overlap_gap_secs;
                    if cue.start >= cue.end {
                        cue.end = cue.start + cfg.invalid_range_fix_secs;
                    }
                }
            }

            let word_count = cue.word_count();
            if word_count > 0 {
                let (min_duration, max_duration) = self.band(word_count);
                let duration = cue.duration();
                if duration > max_duration {
                    debug!("Cue {} too long ({:.2}s, {} words), capping at {:.2}s", i + 1, duration, word_count, max_duration);
                    cue.end = cue.start + max_duration;
                } else if duration < min_duration && duration < cfg.min_duration_floor_secs {
                    let target = min_duration.max(cfg.min_duration_floor_secs);
                    debug!("Cue {} too short ({:.2}s, {} words), extending to {:.2}s", i + 1, duration, word_count, target);
                    cue.end = cue.start + target;
                }
            }

            validated.push(cue);
        }

        validated
    }

    /// List timing problems without changing anything
    pub fn inspect(&self, cues: &[Cue]) -> TimestampReport {
        let mut issues = Vec::new();

        for (index, cue) in cues.iter().enumerate() {
            if !(cue.start < cue.end) {
                issues.push(TimestampIssue::InvalidRange {
                    index,
                    start: cue.start,
                    end: cue.end,
                });
            }

            if index > 0 {
                let prev = &cues[index - 1];
                if cue.start < prev.end {
                    issues.push(TimestampIssue::Overlap {
                        index,
                        overlap_secs: prev.end - cue.start,
                    });
                }
            }

            let word_count = cue.word_count();
            if word_count == 0 || !(cue.start < cue.end) {
                continue;
            }
            let (min_duration, max_duration) = self.band(word_count);
            let duration = cue.duration();
            if duration > max_duration {
                issues.push(TimestampIssue::TooLong { index, duration, max_duration });
            } else if duration < min_duration {
                issues.push(TimestampIssue::TooShort { index, duration, min_duration });
            }
        }

        TimestampReport {
            issues,
            cue_count: cues.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> TimestampValidator {
        TimestampValidator::default()
    }

    fn assert_monotonic(cues: &[Cue]) {
        for cue in cues {
            assert!(cue.end > cue.start, "cue {:?} has no duration", cue);
        }
        for pair in cues.windows(2) {
            assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_validate_invertedRange_shouldExtendByOneSecond() {
        let cues = validator().validate(vec![Cue::new(5.0, 4.0, "one two")]);
        assert_eq!(cues[0].start, 5.0);
        assert!((cues[0].end - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_overlap_shouldShiftStartAfterPrevious() {
        let cues = validator().validate(vec![
            Cue::new(0.0, 2.0, "a b c"),
            Cue::new(1.5, 3.5, "d e f"),
        ]);
        assert!((cues[1].start - 2.1).abs() < 1e-9);
        assert!((cues[1].end - 3.5).abs() < 1e-9);
        assert_monotonic(&cues);
    }

    #[test]
    fn test_validate_overlapSwallowingCue_shouldRecheckRange() {
        let cues = validator().validate(vec![
            Cue::new(0.0, 3.0, "a b c"),
            Cue::new(1.0, 2.0, "d e"),
        ]);
        assert!((cues[1].start - 3.1).abs() < 1e-9);
        assert!(cues[1].end > cues[1].start);
        assert_monotonic(&cues);
    }

    #[test]
    fn test_validate_tooLong_shouldCapToWordBand() {
        let cues = validator().validate(vec![Cue::new(0.0, 10.0, "just three words")]);
        assert!((cues[0].end - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_tooShort_shouldGrowToFloor() {
        let cues = validator().validate(vec![Cue::new(0.0, 0.2, "hi")]);
        assert!((cues[0].end - 0.5).abs() < 1e-9);

        // short but above the floor stays as-is
        let cues = validator().validate(vec![Cue::new(0.0, 0.6, "one two three four five six seven eight")]);
        assert!((cues[0].end - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_validate_cjkText_shouldCountCharacters() {
        let cues = validator().validate(vec![Cue::new(0.0, 4.0, "我今天很高兴。")]);
        assert!((cues[0].end - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_nonFiniteTimes_shouldBeSanitized() {
        let cues = validator().validate(vec![
            Cue::new(0.0, 1.0, "a"),
            Cue::new(f64::NAN, f64::INFINITY, "b"),
        ]);
        assert!(cues[1].start.is_finite() && cues[1].end.is_finite());
        assert_monotonic(&cues);
    }

    #[test]
    fn test_validate_arbitraryInput_shouldBeMonotonic() {
        let raw = vec![
            Cue::new(3.0, 1.0, "x"),
            Cue::new(0.0, 0.0, "y z"),
            Cue::new(2.0, 9.0, "one two"),
            Cue::new(2.5, 2.6, ""),
            Cue::new(-1.0, 0.5, "neg"),
        ];
        let cues = validator().validate(raw);
        assert_eq!(cues.len(), 5);
        assert_monotonic(&cues);
    }

    #[test]
    fn test_inspect_shouldReportWithoutModifying() {
        let cues = vec![
            Cue::new(0.0, 10.0, "two words"),
            Cue::new(9.0, 9.5, "next one"),
            Cue::new(12.0, 11.0, "bad"),
        ];
        let report = validator().inspect(&cues);

        assert!(!report.is_clean());
        assert_eq!(report.overlap_count(), 1);
        assert!(report.issues.contains(&TimestampIssue::InvalidRange { index: 2, start: 12.0, end: 11.0 }));
        assert!(matches!(report.issues[0], TimestampIssue::TooLong { index: 0, .. }));
        assert_eq!(report.issues[0].to_string(), "Cue 1: duration too long: 10.00s (max: 2.00s)");
    }
}
