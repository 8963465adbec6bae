//! Shared test utilities

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jamie_voicebot::{
    AudioArtifact, AudioFormat, ContextEntry, Error, GenerationGateway, Gateways, Persona, Result,
    SynthesisGateway, Transcription, TranscriptionGateway, TurnController,
};

/// Speech-to-text fake keyed by capture bytes; unknown captures are silence
///
/// Scripted captures are written as strings and matched by their bytes.
#[derive(Default)]
pub struct FakeTranscriber {
    scripted: HashMap<Vec<u8>, String>,
    failure: Option<String>,
    malformed: Option<String>,
    pub calls: Mutex<Vec<Vec<u8>>>,
}

impl FakeTranscriber {
    #[must_use]
    pub fn hearing(pairs: &[(&str, &str)]) -> Self {
        Self {
            scripted: pairs
                .iter()
                .map(|(audio, text)| (audio.as_bytes().to_vec(), (*text).to_string()))
                .collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Rejects every capture as an unusable encoding
    #[must_use]
    pub fn rejecting(message: &str) -> Self {
        Self {
            malformed: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TranscriptionGateway for FakeTranscriber {
    async fn transcribe(&self, audio: &[u8], _format: AudioFormat) -> Result<Transcription> {
        self.calls.lock().unwrap().push(audio.to_vec());
        if let Some(message) = &self.failure {
            return Err(Error::Stt(message.clone()));
        }
        if let Some(message) = &self.malformed {
            return Err(Error::Audio(message.clone()));
        }
        Ok(self
            .scripted
            .get(audio)
            .map_or(Transcription::NoSpeech, |text| Transcription::Recognized(text.clone())))
    }

    fn name(&self) -> &'static str {
        "fake-stt"
    }
}

/// Generation fake returning queued replies, then a fixed fallback
pub struct FakeGenerator {
    replies: Mutex<VecDeque<String>>,
    failure: Option<String>,
    stall: Option<Duration>,
    pub calls: Mutex<Vec<Vec<ContextEntry>>>,
}

impl Default for FakeGenerator {
    fn default() -> Self {
        Self::replying(&[])
    }
}

impl FakeGenerator {
    pub const FALLBACK: &'static str = "Tell me more!";

    #[must_use]
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| (*r).to_string()).collect()),
            failure: None,
            stall: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn stalling(delay: Duration) -> Self {
        Self {
            stall: Some(delay),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_context(&self) -> Vec<ContextEntry> {
        self.calls.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl GenerationGateway for FakeGenerator {
    async fn generate(&self, context: &[ContextEntry]) -> Result<String> {
        self.calls.lock().unwrap().push(context.to_vec());
        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(Error::Generation(message.clone()));
        }
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::FALLBACK.to_string()))
    }

    fn name(&self) -> &'static str {
        "fake-llm"
    }
}

/// Synthesis fake producing `audio:<text>` as MP3 bytes
#[derive(Default)]
pub struct FakeSynthesizer {
    failure: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SynthesisGateway for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<AudioArtifact> {
        self.calls.lock().unwrap().push(text.to_string());
        if let Some(message) = &self.failure {
            return Err(Error::Tts(message.clone()));
        }
        Ok(AudioArtifact {
            bytes: format!("audio:{text}").into_bytes(),
            mime_type: "audio/mpeg".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "fake-tts"
    }
}

/// The three fakes, kept around for assertions after they are handed out
pub struct Fakes {
    pub stt: Arc<FakeTranscriber>,
    pub llm: Arc<FakeGenerator>,
    pub tts: Arc<FakeSynthesizer>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self::new(
            FakeTranscriber::default(),
            FakeGenerator::default(),
            FakeSynthesizer::default(),
        )
    }
}

impl Fakes {
    #[must_use]
    pub fn new(stt: FakeTranscriber, llm: FakeGenerator, tts: FakeSynthesizer) -> Self {
        Self {
            stt: Arc::new(stt),
            llm: Arc::new(llm),
            tts: Arc::new(tts),
        }
    }

    #[must_use]
    pub fn gateways(&self) -> Gateways {
        let stt: Arc<dyn TranscriptionGateway> = self.stt.clone();
        let tts: Arc<dyn SynthesisGateway> = self.tts.clone();
        let llm: Arc<dyn GenerationGateway> = self.llm.clone();
        Gateways::new(stt, tts, llm)
    }

    #[must_use]
    pub fn controller(&self) -> TurnController {
        TurnController::new(self.gateways(), test_persona())
    }

    pub fn total_calls(&self) -> usize {
        self.stt.call_count() + self.llm.call_count() + self.tts.call_count()
    }
}

/// Persona used across tests
#[must_use]
pub fn test_persona() -> Arc<Persona> {
    Arc::new(Persona::new("Jamie", "You are Jamie, a warm and curious friend.").unwrap())
}
