//! External service boundaries
//!
//! The turn controller only talks to speech-to-text, text-to-speech and
//! reply generation through these traits, so providers can be swapped
//! without touching turn-taking logic.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::agent::GeminiGenerator;
use crate::config::Config;
use crate::conversation::{Speaker, Turn};
use crate::voice::{AzureSpeechToText, AzureTextToSpeech};
use crate::{Error, Result};

/// Accepted capture encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// 16-bit PCM WAV
    WavPcm16,
}

impl AudioFormat {
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::WavPcm16 => "audio/wav",
        }
    }
}

/// Outcome of a transcription call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcription {
    /// Speech was recognized
    Recognized(String),
    /// The capture held no recognizable speech (not an error)
    NoSpeech,
}

/// Synthesized, playable audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Role of an entry in a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextRole {
    Instruction,
    User,
    Assistant,
}

/// One role-tagged block of a generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextEntry {
    pub role: ContextRole,
    pub text: String,
}

impl ContextEntry {
    #[must_use]
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: ContextRole::Instruction,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn from_turn(turn: &Turn) -> Self {
        let role = match turn.speaker() {
            Speaker::User => ContextRole::User,
            Speaker::Assistant => ContextRole::Assistant,
        };
        Self {
            role,
            text: turn.text().to_string(),
        }
    }
}

/// Speech-to-text service
#[async_trait]
pub trait TranscriptionGateway: Send + Sync {
    /// Transcribe a capture
    ///
    /// # Errors
    ///
    /// Returns error on transport, auth or encoding failure. "No speech"
    /// is `Ok(Transcription::NoSpeech)`.
    async fn transcribe(&self, audio: &[u8], format: AudioFormat) -> Result<Transcription>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Text-to-speech service
#[async_trait]
pub trait SynthesisGateway: Send + Sync {
    /// Synthesize reply text
    ///
    /// # Errors
    ///
    /// Returns error on transport or auth failure
    async fn synthesize(&self, text: &str) -> Result<AudioArtifact>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Reply generation service
///
/// Stateless per call: the caller sends the full context every time.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Generate the next assistant utterance
    ///
    /// # Errors
    ///
    /// Returns error on transport or auth failure, or when no text comes back
    async fn generate(&self, context: &[ContextEntry]) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// The three gateways a controller drives, shared across sessions
#[derive(Clone)]
pub struct Gateways {
    transcription: Arc<dyn TranscriptionGateway>,
    synthesis: Arc<dyn SynthesisGateway>,
    generation: Arc<dyn GenerationGateway>,
    timeout: Option<Duration>,
}

impl Gateways {
    /// Bundle gateways with no time bound
    #[must_use]
    pub fn new(
        transcription: Arc<dyn TranscriptionGateway>,
        synthesis: Arc<dyn SynthesisGateway>,
        generation: Arc<dyn GenerationGateway>,
    ) -> Self {
        Self {
            transcription,
            synthesis,
            generation,
            timeout: None,
        }
    }

    /// Build the Azure speech and Gemini gateways from configuration
    ///
    /// # Errors
    ///
    /// Returns error if a gateway rejects its configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let stt = AzureSpeechToText::new(
            rewrap(&config.speech.api_key),
            &config.speech.region,
            config.speech.language.clone(),
        )?
        .with_base_url(config.speech.stt_base_url.clone());

        let tts = AzureTextToSpeech::new(
            rewrap(&config.speech.api_key),
            &config.speech.region,
            config.speech.voice.clone(),
            config.speech.language.clone(),
        )?
        .with_base_url(config.speech.tts_base_url.clone());

        let llm = GeminiGenerator::new(rewrap(&config.llm.api_key), config.llm.model.clone())?
            .with_base_url(config.llm.base_url.clone());

        Ok(Self::new(Arc::new(stt), Arc::new(tts), Arc::new(llm))
            .with_timeout(config.gateway_timeout))
    }

    /// Bound every gateway call by `timeout`
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Transcribe through the configured gateway
    ///
    /// # Errors
    ///
    /// Propagates gateway errors; a timeout is `Error::Timeout`
    pub async fn transcribe(&self, audio: &[u8], format: AudioFormat) -> Result<Transcription> {
        let gateway = &self.transcription;
        tracing::debug!(provider = gateway.name(), audio_bytes = audio.len(), "transcribing");
        bounded("transcription", self.timeout, gateway.transcribe(audio, format)).await
    }

    /// Synthesize through the configured gateway
    ///
    /// # Errors
    ///
    /// Propagates gateway errors; a timeout is `Error::Timeout`
    pub async fn synthesize(&self, text: &str) -> Result<AudioArtifact> {
        let gateway = &self.synthesis;
        tracing::debug!(provider = gateway.name(), chars = text.len(), "synthesizing");
        bounded("synthesis", self.timeout, gateway.synthesize(text)).await
    }

    /// Generate through the configured gateway
    ///
    /// # Errors
    ///
    /// Propagates gateway errors; a timeout is `Error::Timeout`
    pub async fn generate(&self, context: &[ContextEntry]) -> Result<String> {
        let gateway = &self.generation;
        tracing::debug!(provider = gateway.name(), entries = context.len(), "generating");
        bounded("generation", self.timeout, gateway.generate(context)).await
    }
}

/// Copy a credential into a new secret owned by one gateway
fn rewrap(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

async fn bounded<T, F>(gateway: &'static str, limit: Option<Duration>, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
            tracing::warn!(gateway, secs = limit.as_secs(), "gateway call timed out");
            Error::Timeout {
                gateway,
                secs: limit.as_secs(),
            }
        })?,
        None => call.await,
    }
}
