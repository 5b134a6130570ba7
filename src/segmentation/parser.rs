/*!
 * Tolerant parser for segment lists returned by the LLM.
 *
 * Models wrap the JSON array in prose or code fences, mix bare strings with
 * objects and sometimes emit objects without text. The first balanced
 * top-level array is extracted and every element with usable text becomes
 * a segment.
 */

use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::ParseError;

/// One segment proposed by the LLM
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,

    /// Word count the model claims for the segment, if it gave one
    pub approx_word_count: Option<u32>,
}

impl Segment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            approx_word_count: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSegment {
    Plain(String),
    Object {
        #[serde(default)]
        text: Option<String>,
        #[serde(default, alias = "wordCount")]
        word_count: Option<u32>,
    },
    Other(Value),
}

/// Locate the first balanced `[...]` in `response`, ignoring brackets inside strings
fn find_array(response: &str) -> Option<&str> {
    let start = response.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in response[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse `response` into segments, reporting why parsing failed
pub fn try_parse(response: &str) -> Result<Vec<Segment>, ParseError> {
    let array = find_array(response).ok_or(ParseError::NoArray)?;
    let raw: Vec<RawSegment> = serde_json::from_str(array)
        .map_err(|e| ParseError::Malformed(e.to_string()))?;

    let mut segments = Vec::with_capacity(raw.len());
    for item in raw {
        let (text, approx_word_count) = match item {
            RawSegment::Plain(text) => (text, None),
            RawSegment::Object { text: Some(text), word_count } => (text, word_count),
            RawSegment::Object { text: None, .. } => continue,
            RawSegment::Other(value) => {
                debug!("Ignoring non-text segment: {}", value);
                continue;
            }
        };

        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        segments.push(Segment {
            text: text.to_string(),
            approx_word_count,
        });
    }

    Ok(segments)
}

/// Parse `response` into segments; an unusable response yields no segments
pub fn parse(response: &str) -> Vec<Segment> {
    match try_parse(response) {
        Ok(segments) => segments,
        Err(e) => {
            warn!("Could not parse LLM segments: {}", e);
            Vec::new()
        }
    }
}
