/*!
 * Speech recognizer seam.
 *
 * The engine never runs recognition itself; callers plug in whatever engine
 * they use (whisper bindings, a remote service, a fixture in tests).
 */

use async_trait::async_trait;
use std::path::Path;

use crate::errors::RecognitionError;
use crate::words::WordStore;

/// Output of one recognition run
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub words: WordStore,
    /// Detected language code (ISO 639-1 where available)
    pub language: String,
}

#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Transcribe a media file into timed words
    async fn transcribe(&self, media_path: &Path) -> Result<Transcription, RecognitionError>;
}
