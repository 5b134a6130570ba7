/*!
 * Prompt construction for LLM subtitle splitting.
 *
 * Prompts are deterministic for a given chunk and settings. The chunk text is
 * placed between fixed markers so it can be recovered from the prompt.
 */

use crate::language_utils::get_language_name;

/// Marker opening the text block of a prompt
pub const TEXT_START_MARKER: &str = "<<<TEXT";

/// Marker closing the text block of a prompt
pub const TEXT_END_MARKER: &str = ">>>";

/// Shape of the output requested from the model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitMode {
    /// JSON array of strings
    Simple,

    /// JSON array of `{"text", "word_count"}` objects sized from the word count
    Smart { approx_word_count: usize },
}

/// Segment length band derived from the maximum words per segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentBand {
    pub min: usize,
    pub target: usize,
    pub max: usize,
}

impl SegmentBand {
    /// Band ending at `max`, e.g. 13 gives 7-13 with target 10
    pub fn from_max(max: usize) -> Self {
        let max = max.max(1);
        let min = max.saturating_sub(6).max(1);
        Self {
            min,
            target: (min + max) / 2,
            max,
        }
    }
}

const RULES: &str = r#"You are a subtitle splitter. Your ONLY task is to split the text below into shorter subtitle segments.

CRITICAL RULES:
1. DO NOT modify, correct, or rewrite any words of the original text
2. DO NOT fix grammar, spelling, or punctuation
3. DO NOT rearrange, summarize, or paraphrase anything
4. ONLY split the text: every word must appear exactly once, in the original order"#;

const GUIDELINES: &str = r#"SPLITTING GUIDELINES:
- Target length: about {target} words per segment ({min}-{max} words is fine)
- Prefer splitting after sentence-final punctuation
- Otherwise split after commas, semicolons, or before conjunctions
- Never split inside a name, a number, or a fixed expression
- Avoid segments of only one or two words unless the sentence is that short"#;

const SIMPLE_OUTPUT: &str = r#"OUTPUT FORMAT:
Return ONLY a JSON array of strings, one string per segment, with no other text.
Example: ["First segment of the text,", "second segment of the text."]"#;

const SMART_OUTPUT: &str = r#"OUTPUT FORMAT:
Return ONLY a JSON array of objects with "text" and "word_count" fields, with no other text.
Example: [{"text": "First segment of the text,", "word_count": 5}, {"text": "second segment.", "word_count": 2}]"#;

/// Builder for split prompts
#[derive(Debug, Clone)]
pub struct SplitPromptBuilder {
    band: SegmentBand,
    language_name: Option<String>,
    mode: SplitMode,
}

impl SplitPromptBuilder {
    pub fn new(max_segment_words: usize, mode: SplitMode) -> Self {
        Self {
            band: SegmentBand::from_max(max_segment_words),
            language_name: None,
            mode,
        }
    }

    /// Name the text's language in the prompt; `auto` and unknown codes are ignored
    pub fn with_language(mut self, language_hint: &str) -> Self {
        let hint = language_hint.trim();
        self.language_name = if hint.is_empty() || hint.eq_ignore_ascii_case("auto") {
            None
        } else {
            get_language_name(hint).ok()
        };
        self
    }

    pub fn band(&self) -> SegmentBand {
        self.band
    }

    /// Number of segments a smart split should aim for
    pub fn expected_segments(&self, approx_word_count: usize) -> usize {
        approx_word_count.div_ceil(self.band.target.max(1)).max(1)
    }

    /// Build the full prompt for `text`
    pub fn build(&self, text: &str) -> String {
        let mut prompt = String::from(RULES);
        prompt.push_str("\n\n");

        if let Some(language) = &self.language_name {
            prompt.push_str(&format!("The text is in {}. Keep it in {}.\n\n", language, language));
        }

        prompt.push_str(
            &GUIDELINES
                .replace("{target}", &self.band.target.to_string())
                .replace("{min}", &self.band.min.to_string())
                .replace("{max}", &self.band.max.to_string()),
        );
        prompt.push_str("\n\n");

        match self.mode {
            SplitMode::Simple => prompt.push_str(SIMPLE_OUTPUT),
            SplitMode::Smart { approx_word_count } => {
                prompt.push_str(&format!(
                    "The text has about {} words, so aim for about {} segments.\n",
                    approx_word_count,
                    self.expected_segments(approx_word_count)
                ));
                prompt.push_str(SMART_OUTPUT);
            }
        }

        prompt.push_str("\n\nTEXT TO SPLIT:\n");
        prompt.push_str(TEXT_START_MARKER);
        prompt.push('\n');
        prompt.push_str(text.trim());
        prompt.push('\n');
        prompt.push_str(TEXT_END_MARKER);
        prompt
    }
}

/// Recover the text block from a prompt built by [`SplitPromptBuilder`]
pub fn extract_prompt_text(prompt: &str) -> Option<&str> {
    let start = prompt.rfind(TEXT_START_MARKER)? + TEXT_START_MARKER.len();
    let end = prompt[start..].rfind(TEXT_END_MARKER)? + start;
    Some(prompt[start..end].trim())
}
