//! Conversation history and audio capture identity

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One recorded utterance
///
/// Turns are immutable once created; there are no setters. Equality
/// compares speaker and text only.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    speaker: Speaker,
    text: String,
    created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a turn
    ///
    /// # Errors
    ///
    /// Returns error if `text` is empty after trimming
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::Generation(format!(
                "refusing to record an empty {speaker:?} turn"
            )));
        }

        Ok(Self {
            speaker,
            text,
            created_at: Utc::now(),
        })
    }

    /// Create a user turn
    ///
    /// # Errors
    ///
    /// Returns error if `text` is empty after trimming
    pub fn user(text: impl Into<String>) -> Result<Self> {
        Self::new(Speaker::User, text)
    }

    /// Create an assistant turn
    ///
    /// # Errors
    ///
    /// Returns error if `text` is empty after trimming
    pub fn assistant(text: impl Into<String>) -> Result<Self> {
        Self::new(Speaker::Assistant, text)
    }

    #[must_use]
    pub const fn speaker(&self) -> Speaker {
        self.speaker
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl PartialEq for Turn {
    fn eq(&self, other: &Self) -> bool {
        self.speaker == other.speaker && self.text == other.text
    }
}

impl Eq for Turn {}

/// Append-only ordered turn history for one session
#[derive(Debug, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
}

impl ConversationStore {
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append a turn at the end of the history
    pub fn append(&mut self, turn: Turn) {
        tracing::debug!(
            speaker = ?turn.speaker(),
            chars = turn.text().len(),
            position = self.turns.len(),
            "turn appended"
        );
        self.turns.push(turn);
    }

    /// All turns in conversation order
    #[must_use]
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Identity of a raw audio capture
///
/// Two captures are the same iff their bytes are identical; the SHA-256
/// digest stands in for the bytes so the controller never retains audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFingerprint([u8; 32]);

impl AudioFingerprint {
    /// Fingerprint a capture
    #[must_use]
    pub fn of(audio: &[u8]) -> Self {
        Self(Sha256::digest(audio).into())
    }

    /// Hex form for logging
    #[must_use]
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..6])
    }
}
