//! Error types for the Jamie voicebot

use thiserror::Error;

/// Result type alias for voicebot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voicebot
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credential, bad value)
    #[error("configuration error: {0}")]
    Config(String),

    /// Captured audio is not in the accepted encoding
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Reply generation error
    #[error("generation error: {0}")]
    Generation(String),

    /// A gateway call exceeded its time bound
    #[error("{gateway} timed out after {secs}s")]
    Timeout {
        gateway: &'static str,
        secs: u64,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether this error came from one of the external gateways
    ///
    /// Gateway errors abort the current turn but leave the session usable.
    #[must_use]
    pub const fn is_gateway(&self) -> bool {
        matches!(
            self,
            Self::Stt(_)
                | Self::Tts(_)
                | Self::Generation(_)
                | Self::Timeout { .. }
                | Self::Http(_)
        )
    }

    /// Whether the caller supplied input the voicebot cannot use
    ///
    /// Like gateway errors, these abort the turn but leave the session usable.
    #[must_use]
    pub const fn is_bad_input(&self) -> bool {
        matches!(self, Self::Audio(_))
    }
}
