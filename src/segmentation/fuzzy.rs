/*!
 * Token normalization and fuzzy matching between LLM text and recognized words.
 *
 * Scores are in 0.0-1.0: exact matches score 1.0, containment scores the
 * length ratio scaled by 0.9, anything else falls back to normalized
 * Levenshtein similarity when it clears the floor.
 */

use crate::words::token_spans;

/// Punctuation replaced by whitespace before tokenizing
const SEPARATOR_PUNCTUATION: &[char] = &[
    ',', '.', '!', '?', ';', ':', '"', '(', ')', '[', ']', '{', '}', '…', '—',
    '，', '。', '！', '？', '；', '：', '、', '“', '”', '（', '）', '《', '》', '「', '」',
];

/// Apostrophes are dropped so contractions stay one token
const APOSTROPHES: &[char] = &['\'', '’', '‘'];

/// Scale applied to containment matches
const CONTAINMENT_WEIGHT: f64 = 0.9;

fn normalize_into(text: &str, out: &mut String) {
    for c in text.chars() {
        if APOSTROPHES.contains(&c) {
            continue;
        }
        if SEPARATOR_PUNCTUATION.contains(&c) {
            out.push(' ');
        } else {
            out.extend(c.to_lowercase());
        }
    }
}

/// Lowercased tokens of `text` with punctuation stripped
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut cleaned = String::new();

    for span in token_spans(text) {
        cleaned.clear();
        normalize_into(&text[span], &mut cleaned);
        tokens.extend(cleaned.split_whitespace().map(str::to_string));
    }
    tokens
}

/// Recognized word text in matching form; empty for punctuation-only words
pub fn clean_word(text: &str) -> String {
    let mut cleaned = String::new();
    normalize_into(text, &mut cleaned);
    cleaned.split_whitespace().collect()
}

/// Levenshtein distance over any comparable sequence
pub fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let a_len = a.len();
    let b_len = b.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Use two-row optimization for space efficiency
    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr_row[0] = i;

        for j in 1..=b_len {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };

            curr_row[j] = (prev_row[j] + 1)                  // deletion
                .min(curr_row[j - 1] + 1)                    // insertion
                .min(prev_row[j - 1] + cost);                // substitution
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Calculate Levenshtein distance between two strings
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    levenshtein(&a_chars, &b_chars)
}

/// 1 - normalized edit distance
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 0 && b_len == 0 {
        return 1.0;
    }
    let max_len = a_len.max(b_len);
    1.0 - levenshtein_distance(a, b) as f64 / max_len as f64
}

/// Similarity between an LLM token and a cleaned recognizer word.
///
/// Returns 0.0 when neither containment nor edit similarity clears `floor`.
pub fn match_score(token: &str, word: &str, floor: f64) -> f64 {
    if token.is_empty() || word.is_empty() {
        return 0.0;
    }
    if token == word {
        return 1.0;
    }

    let token_len = token.chars().count();
    let word_len = word.chars().count();
    if token.contains(word) || word.contains(token) {
        let ratio = token_len.min(word_len) as f64 / token_len.max(word_len) as f64;
        return ratio * CONTAINMENT_WEIGHT;
    }

    let sim = similarity(token, word);
    if sim > floor { sim } else { 0.0 }
}

/// Edit similarity of two token streams, 1.0 when identical or both empty
pub fn token_similarity(a: &[String], b: &[String]) -> f64 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}
