//! Speech-to-text (STT) via the Azure Speech short-audio REST API

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::gateway::{AudioFormat, Transcription, TranscriptionGateway};
use crate::{Error, Result};

use super::wav::inspect_wav;

/// Recognition path below the regional host
const RECOGNITION_PATH: &str = "/speech/recognition/conversation/cognitiveservices/v1";

/// Response from the Azure short-audio recognition API (simple format)
#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecognitionResponse {
    recognition_status: String,
    #[serde(default)]
    display_text: Option<String>,
}

/// Transcribes speech to text
pub struct AzureSpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    language: String,
}

impl AzureSpeechToText {
    /// Create a new STT instance for an Azure region
    ///
    /// # Errors
    ///
    /// Returns error if the key is empty or the region is not a plain region name
    pub fn new(api_key: SecretString, region: &str, language: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "Azure speech key required for STT".to_string(),
            ));
        }
        validate_region(region)?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: format!("https://{region}.stt.speech.microsoft.com"),
            language,
        })
    }

    /// Point requests at a different host (e.g. a private endpoint)
    #[must_use]
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        self
    }

    /// Transcribe WAV audio to text
    ///
    /// # Errors
    ///
    /// Returns error if the capture is not 16-bit PCM WAV, the request
    /// fails, or the service reports a failure other than "no speech"
    pub async fn recognize(&self, audio: &[u8]) -> Result<Transcription> {
        let info = inspect_wav(audio)?;
        tracing::debug!(
            audio_bytes = audio.len(),
            sample_rate = info.sample_rate,
            duration_ms = info.duration_ms,
            "starting Azure transcription"
        );

        let url = format!("{}{RECOGNITION_PATH}", self.base_url);
        let content_type = format!(
            "{}; codecs=audio/pcm; samplerate={}",
            AudioFormat::WavPcm16.mime_type(),
            info.sample_rate
        );

        let response = self
            .client
            .post(&url)
            .query(&[("language", self.language.as_str()), ("format", "simple")])
            .header("Ocp-Apim-Subscription-Key", self.api_key.expose_secret())
            .header("Content-Type", content_type)
            .header("Accept", "application/json")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Azure STT request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Azure STT API error");
            return Err(Error::Stt(format!("Azure STT API error {status}: {body}")));
        }

        let result: RecognitionResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Azure STT response");
            e
        })?;

        interpret(result)
    }
}

/// Map a recognition status onto a transcription outcome
fn interpret(result: RecognitionResponse) -> Result<Transcription> {
    match result.recognition_status.as_str() {
        "Success" => {
            let text = result.display_text.unwrap_or_default();
            if text.trim().is_empty() {
                tracing::info!("recognized empty text, treating as no speech");
                Ok(Transcription::NoSpeech)
            } else {
                tracing::info!(transcript = %text, "transcription complete");
                Ok(Transcription::Recognized(text))
            }
        }
        "NoMatch" | "InitialSilenceTimeout" | "BabbleTimeout" => {
            tracing::info!(status = %result.recognition_status, "no speech recognized");
            Ok(Transcription::NoSpeech)
        }
        other => Err(Error::Stt(format!("recognition failed: {other}"))),
    }
}

/// Reject region strings that could alter the endpoint host
pub(crate) fn validate_region(region: &str) -> Result<()> {
    if region.is_empty() || !region.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::Config(format!(
            "invalid Azure speech region: {region:?}"
        )));
    }
    Ok(())
}

#[async_trait]
impl TranscriptionGateway for AzureSpeechToText {
    async fn transcribe(&self, audio: &[u8], format: AudioFormat) -> Result<Transcription> {
        match format {
            AudioFormat::WavPcm16 => self.recognize(audio).await,
        }
    }

    fn name(&self) -> &'static str {
        "azure-stt"
    }
}
