/*!
 * # resegment - subtitle resegmentation and alignment
 *
 * A Rust library that turns word-level speech timings into readable
 * subtitle cues. An LLM decides where lines break; a fuzzy aligner maps
 * every line back onto the recognized words to find its timing.
 *
 * ## Features
 *
 * - Content-addressed cache of recognized word timings
 * - Sentence-aware chunking of long transcripts
 * - LLM splitting through various providers:
 *   - Ollama (local LLM)
 *   - OpenAI-compatible APIs (OpenAI, LM Studio, DeepSeek, SiliconFlow)
 *   - Anthropic API
 * - Tolerant parsing of LLM output
 * - Fuzzy word alignment robust to recognition errors
 * - Timestamp repair and a rule-based fallback segmenter
 * - SubRip input and output
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `words`: Timed words and tokenization
 * - `cache`: Word timing cache
 * - `recognizer`: Speech recognizer seam
 * - `segmentation`: Chunking, prompting, parsing, alignment and repair
 * - `session`: Job requests and the session controller
 * - `subtitle_processor`: SubRip reading and writing
 * - `providers`: Client implementations for various LLM providers
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `logging`: Colored stderr logger for host applications
 * - `errors`: Custom error types
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod cache;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod logging;
pub mod providers;
pub mod recognizer;
pub mod segmentation;
pub mod session;
pub mod subtitle_processor;
pub mod words;

// Re-export main types for easier usage
pub use app_config::Config;
pub use cache::{CacheEntry, ContentCache, KeyPolicy};
pub use errors::{CacheError, LlmError, ParseError, RecognitionError, ResegmentError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use recognizer::{Recognizer, Transcription};
pub use session::{CancellationFlag, JobEvent, JobMode, JobOutcome, JobRequest, JobStatus, SessionController};
pub use subtitle_processor::{Cue, SubtitleCollection};
pub use words::{Word, WordStore};
