/*!
 * Error types for the resegment engine.
 *
 * Each stage of the pipeline has its own error type so the session
 * controller can decide which failures are local to a chunk and which
 * end the job. Everything is defined with thiserror.
 */

use thiserror::Error;

/// Broad classification of LLM failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// The request did not complete within the configured timeout
    Timeout,
    /// Connection, DNS, TLS or server-side failure
    Transport,
    /// Credentials were refused
    AuthRejected,
    /// The provider throttled the request
    RateLimited,
}

/// Errors that can occur when talking to an LLM provider
#[derive(Error, Debug)]
pub enum LlmError {
    /// Request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error establishing or maintaining a connection
    #[error("Transport error: {0}")]
    Transport(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthRejected(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The response stream could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Classify this error
    pub fn kind(&self) -> LlmErrorKind {
        match self {
            Self::Timeout(_) => LlmErrorKind::Timeout,
            Self::AuthRejected(_) => LlmErrorKind::AuthRejected,
            Self::RateLimited(_) => LlmErrorKind::RateLimited,
            Self::Transport(_) | Self::Api { .. } | Self::InvalidResponse(_) => LlmErrorKind::Transport,
        }
    }

    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) | Self::RateLimited(_) => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            Self::AuthRejected(_) | Self::InvalidResponse(_) => false,
        }
    }

    /// Map an HTTP error status to an error
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthRejected(message),
            429 => Self::RateLimited(message),
            _ => Self::Api { status_code, message },
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if let Some(status) = error.status() {
            Self::from_status(status.as_u16(), error.to_string())
        } else if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Errors from the word timing cache. Never fatal unless the cache is mandatory.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading or writing a cache file failed
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cache entry could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Fingerprinting a source file failed
    #[error("Hashing failed: {0}")]
    Hashing(String),

    /// The cache directory cannot be used
    #[error("Cache directory unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a speech recognizer
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// The media file cannot be decoded
    #[error("Unsupported media format: {0}")]
    UnsupportedFormat(String),

    /// The recognizer produced no words at all
    #[error("No speech detected in {0}")]
    NoSpeech(String),

    /// Any other recognizer failure
    #[error("Recognizer failure: {0}")]
    Engine(String),
}

/// Errors raised while extracting segments from LLM output
#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    /// The response holds no bracketed array
    #[error("No JSON array found in response")]
    NoArray,

    /// The array could not be decoded
    #[error("Malformed JSON array: {0}")]
    Malformed(String),
}

/// Job-level error type returned by the session controller
#[derive(Error, Debug)]
pub enum ResegmentError {
    /// Recognition failed or produced nothing usable
    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// The cache is mandatory and unusable
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Existing subtitles could not be read
    #[error("Subtitle error: {0}")]
    Subtitle(String),

    /// Invalid configuration or request
    #[error("Configuration error: {0}")]
    Config(String),

    /// The job was cancelled between chunks
    #[error("Job cancelled")]
    Cancelled,

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for ResegmentError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for ResegmentError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
