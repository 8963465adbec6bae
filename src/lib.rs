//! Jamie - a voice-enabled conversational companion
//!
//! This library provides the core functionality for the Jamie voicebot:
//! - Turn-taking over spoken and typed input with duplicate capture suppression
//! - Speech-to-text and text-to-speech via Azure Speech
//! - Reply generation via Gemini with the full conversation as context
//! - A browser front-end served over HTTP and a terminal chat
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Presentation                       │
//! │      Browser page (/api/sessions)  │  jamie chat     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │          TurnController (one per session)            │
//! │   classify input  │  history  │  last capture        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Gateways                          │
//! │   Azure STT   │   Gemini   │   Azure TTS             │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod persona;
pub mod presentation;
pub mod session;
pub mod setup;
pub mod voice;

pub use config::Config;
pub use controller::{InputEvent, TurnController, TurnOutcome, classify_input};
pub use conversation::{AudioFingerprint, ConversationStore, Speaker, Turn};
pub use error::{Error, Result};
pub use gateway::{
    AudioArtifact, AudioFormat, ContextEntry, ContextRole, GenerationGateway, Gateways,
    SynthesisGateway, Transcription, TranscriptionGateway,
};
pub use persona::Persona;
pub use session::SessionRegistry;
