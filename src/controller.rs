//! Turn-taking conversation controller
//!
//! Decides whether an interaction carries a new user turn, drives
//! transcription, generation and synthesis in sequence, and keeps the
//! session's history consistent when any of those calls fail.
//!
//! ```text
//!  audio / text ──► classify ──► AudioTurn ──► transcribe ──► NoSpeech ──► Idle
//!                      │                           │
//!                      │                           ▼
//!                      ├──────► TextTurn ──► user turn appended
//!                      │                           │
//!                      ▼                           ▼
//!                   NoTurn ──► Idle     generate(persona + history)
//!                                                  │
//!                                                  ▼
//!                                   synthesize ──► assistant turn appended
//! ```

use std::sync::Arc;

use uuid::Uuid;

use crate::Result;
use crate::conversation::{AudioFingerprint, ConversationStore, Turn};
use crate::gateway::{AudioArtifact, AudioFormat, ContextEntry, Gateways, Transcription};
use crate::persona::Persona;

/// What an interaction amounts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent<'a> {
    /// A capture not seen before
    AudioTurn(&'a [u8]),
    /// Typed text, already trimmed and non-empty
    TextTurn(String),
    /// Nothing new: no input, blank text or a repeated capture
    NoTurn,
}

/// Result of handling one interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// No turn was recorded
    Idle,
    /// A user turn and the assistant's spoken reply were recorded
    Replied {
        user: Turn,
        assistant: Turn,
        audio: AudioArtifact,
    },
}

/// Classify raw input against the last consumed capture
///
/// Audio is checked first and wins when text is pending in the same
/// cycle. An empty buffer counts as no capture.
#[must_use]
pub fn classify_input<'a>(
    new_audio: Option<&'a [u8]>,
    typed: Option<&str>,
    last_consumed: Option<&AudioFingerprint>,
) -> InputEvent<'a> {
    let fresh_audio = new_audio
        .filter(|a| !a.is_empty())
        .filter(|a| last_consumed != Some(&AudioFingerprint::of(a)));
    if let Some(audio) = fresh_audio {
        return InputEvent::AudioTurn(audio);
    }

    match typed.map(str::trim) {
        Some(text) if !text.is_empty() => InputEvent::TextTurn(text.to_string()),
        _ => InputEvent::NoTurn,
    }
}

/// Per-session conversation controller
///
/// Owns the session's history and the identity of the last consumed
/// capture. One interaction is handled at a time (`&mut self`).
pub struct TurnController {
    id: Uuid,
    gateways: Gateways,
    persona: Arc<Persona>,
    history: ConversationStore,
    last_consumed_audio: Option<AudioFingerprint>,
}

impl TurnController {
    /// Start a session with empty history
    #[must_use]
    pub fn new(gateways: Gateways, persona: Arc<Persona>) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(session_id = %id, "conversation started");
        Self {
            id,
            gateways,
            persona,
            history: ConversationStore::new(),
            last_consumed_audio: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn history(&self) -> &ConversationStore {
        &self.history
    }

    #[must_use]
    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Classify input and, for a new capture, mark it consumed
    ///
    /// The capture is recorded before any transcription is attempted, so
    /// it is never processed twice even if transcription fails.
    pub fn classify<'a>(&mut self, new_audio: Option<&'a [u8]>, typed: Option<&str>) -> InputEvent<'a> {
        let event = classify_input(new_audio, typed, self.last_consumed_audio.as_ref());

        if let InputEvent::AudioTurn(audio) = event {
            let fingerprint = AudioFingerprint::of(audio);
            tracing::debug!(session_id = %self.id, capture = %fingerprint.short_hex(), "new capture consumed");
            self.last_consumed_audio = Some(fingerprint);
        } else if new_audio.is_some_and(|a| !a.is_empty()) {
            tracing::debug!(session_id = %self.id, "repeated capture ignored");
        }

        event
    }

    /// Handle a classified event
    ///
    /// # Errors
    ///
    /// Propagates any gateway error. A failed generation or synthesis
    /// leaves the user turn recorded and no assistant turn.
    pub async fn handle_turn(&mut self, event: InputEvent<'_>) -> Result<TurnOutcome> {
        let text = match event {
            InputEvent::NoTurn => return Ok(TurnOutcome::Idle),
            InputEvent::TextTurn(text) => text,
            InputEvent::AudioTurn(audio) => {
                match self.gateways.transcribe(audio, AudioFormat::WavPcm16).await? {
                    Transcription::Recognized(text) if !text.trim().is_empty() => {
                        text.trim().to_string()
                    }
                    Transcription::Recognized(_) | Transcription::NoSpeech => {
                        tracing::info!(session_id = %self.id, "capture dropped: no speech recognized");
                        return Ok(TurnOutcome::Idle);
                    }
                }
            }
        };

        let user = Turn::user(text)?;
        self.history.append(user.clone());
        tracing::info!(session_id = %self.id, turns = self.history.len(), "user turn added");

        self.reply(user).await
    }

    /// Entry point for a captured audio buffer
    ///
    /// # Errors
    ///
    /// Propagates any gateway error
    pub async fn on_audio_captured(&mut self, audio: &[u8]) -> Result<TurnOutcome> {
        let event = self.classify(Some(audio), None);
        self.handle_turn(event).await
    }

    /// Entry point for a typed submission
    ///
    /// # Errors
    ///
    /// Propagates any gateway error
    pub async fn on_text_submitted(&mut self, text: &str) -> Result<TurnOutcome> {
        let event = self.classify(None, Some(text));
        self.handle_turn(event).await
    }

    /// Entry point for a cycle in which both inputs may be pending
    ///
    /// # Errors
    ///
    /// Propagates any gateway error
    pub async fn process(&mut self, audio: Option<&[u8]>, typed: Option<&str>) -> Result<TurnOutcome> {
        let event = self.classify(audio, typed);
        self.handle_turn(event).await
    }

    /// Persona instruction followed by the whole history, in order
    #[must_use]
    pub fn generation_context(&self) -> Vec<ContextEntry> {
        std::iter::once(ContextEntry::instruction(self.persona.instruction()))
            .chain(self.history.all().iter().map(ContextEntry::from_turn))
            .collect()
    }

    /// Generate, synthesize and record the assistant's reply
    async fn reply(&mut self, user: Turn) -> Result<TurnOutcome> {
        let context = self.generation_context();
        let reply = self.gateways.generate(&context).await?;

        let assistant = Turn::assistant(reply.trim())?;
        let audio = self.gateways.synthesize(assistant.text()).await?;

        self.history.append(assistant.clone());
        tracing::info!(
            session_id = %self.id,
            turns = self.history.len(),
            audio_bytes = audio.bytes.len(),
            "assistant turn added"
        );

        Ok(TurnOutcome::Replied {
            user,
            assistant,
            audio,
        })
    }
}
