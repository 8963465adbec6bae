//! Text-to-speech (TTS) via the Azure Speech REST API

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::gateway::{AudioArtifact, SynthesisGateway};
use crate::{Error, Result};

use super::stt::validate_region;

/// Synthesis path below the regional host
const SYNTHESIS_PATH: &str = "/cognitiveservices/v1";

/// Fixed output encoding
const OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

/// MIME type of the synthesized artifact
pub const OUTPUT_MIME: &str = "audio/mpeg";

/// Synthesizes speech from text
pub struct AzureTextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    voice: String,
    language: String,
}

impl AzureTextToSpeech {
    /// Create a new TTS instance for an Azure region
    ///
    /// # Errors
    ///
    /// Returns error if the key is empty or the region is not a plain region name
    pub fn new(
        api_key: SecretString,
        region: &str,
        voice: String,
        language: String,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "Azure speech key required for TTS".to_string(),
            ));
        }
        validate_region(region)?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: format!("https://{region}.tts.speech.microsoft.com"),
            voice,
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

    /// Synthesize text to speech
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails or returns no audio
    pub async fn speak(&self, text: &str) -> Result<Vec<u8>> {
        let ssml = build_ssml(&self.language, &self.voice, text);
        let url = format!("{}{SYNTHESIS_PATH}", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", self.api_key.expose_secret())
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header("User-Agent", concat!("jamie-voicebot/", env!("CARGO_PKG_VERSION")))
            .body(ssml)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("Azure TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(Error::Tts("Azure TTS returned no audio".to_string()));
        }

        tracing::debug!(audio_bytes = audio.len(), voice = %self.voice, "synthesis complete");
        Ok(audio.to_vec())
    }
}

/// Wrap text in a single-voice SSML document
fn build_ssml(language: &str, voice: &str, text: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='{lang}'><voice xml:lang='{lang}' name='{voice}'>{text}</voice></speak>",
        lang = escape_xml(language),
        voice = escape_xml(voice),
        text = escape_xml(text),
    )
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[async_trait]
impl SynthesisGateway for AzureTextToSpeech {
    async fn synthesize(&self, text: &str) -> Result<AudioArtifact> {
        let bytes = self.speak(text).await?;
        Ok(AudioArtifact {
            bytes,
            mime_type: OUTPUT_MIME.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "azure-tts"
    }
}
