/*!
 * Check that an LLM split kept the original words.
 *
 * The segments are joined and compared token by token with the text that was
 * sent. Models that "fix" spelling or paraphrase show up as a similarity
 * below the threshold; the result is only reported, never enforced.
 */

use log::{info, warn};

use crate::segmentation::fuzzy::{token_similarity, tokenize};
use crate::segmentation::parser::Segment;

/// Outcome of comparing segments with their source text
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityReport {
    /// Token-level similarity in 0.0-1.0
    pub similarity: f64,
    pub threshold: f64,
    pub passed: bool,
    pub expected_tokens: usize,
    pub actual_tokens: usize,
}

/// Compare the tokens of `expected` with the tokens of `segments`
pub fn check_integrity(expected: &str, segments: &[Segment], threshold: f64) -> IntegrityReport {
    let expected_tokens = tokenize(expected);
    let actual_tokens: Vec<String> = segments.iter().flat_map(|s| tokenize(&s.text)).collect();

    let similarity = token_similarity(&expected_tokens, &actual_tokens);
    let passed = similarity >= threshold;

    if passed {
        info!("Text integrity {:.1}%", similarity * 100.0);
    } else {
        warn!(
            "LLM changed the text: similarity {:.1}% below {:.0}% ({} tokens sent, {} returned)",
            similarity * 100.0,
            threshold * 100.0,
            expected_tokens.len(),
            actual_tokens.len()
        );
    }

    IntegrityReport {
        similarity,
        threshold,
        passed,
        expected_tokens: expected_tokens.len(),
        actual_tokens: actual_tokens.len(),
    }
}
