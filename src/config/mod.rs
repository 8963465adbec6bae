//! Configuration management for the Jamie voicebot
//!
//! Values are resolved once at startup with precedence env > TOML file >
//! default. The generation credential, speech credential and speech region
//! are required; if any is absent loading fails before anything is served.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::persona::{DEFAULT_PERSONA_NAME, Persona};
use crate::{Error, Result};

use file::JamieConfigFile;

/// Environment variable holding the generation service key
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Environment variable holding the speech service key
pub const AZURE_KEY_ENV: &str = "AZURE_TTS_KEY";

/// Environment variable holding the speech service region
pub const AZURE_REGION_ENV: &str = "AZURE_TTS_REGION";

/// Default generation model
pub const DEFAULT_LLM_MODEL: &str = "gemini-1.5-flash";

/// Default synthesis voice
pub const DEFAULT_TTS_VOICE: &str = "en-US-JennyNeural";

/// Default recognition/synthesis language
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8501;

/// Default largest accepted audio capture (10 MiB)
pub const DEFAULT_MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

/// Default per gateway call time bound
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 60;

/// Default idle time before a server session is discarded
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Voicebot configuration
#[derive(Debug)]
pub struct Config {
    /// Active persona
    pub persona: Persona,

    /// Generation model configuration
    pub llm: LlmConfig,

    /// Speech service configuration
    pub speech: SpeechConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Time bound applied to every gateway call (`None` = unbounded)
    pub gateway_timeout: Option<Duration>,
}

/// Generation model configuration
#[derive(Debug)]
pub struct LlmConfig {
    /// Google generative language API key
    pub api_key: SecretString,

    /// Model identifier
    pub model: String,

    /// API base URL override
    pub base_url: Option<String>,
}

/// Speech service configuration
#[derive(Debug)]
pub struct SpeechConfig {
    /// Azure speech subscription key
    pub api_key: SecretString,

    /// Azure speech region
    pub region: String,

    /// Synthesis voice name
    pub voice: String,

    /// Recognition and synthesis language
    pub language: String,

    /// Recognition endpoint base URL override
    pub stt_base_url: Option<String>,

    /// Synthesis endpoint base URL override
    pub tts_base_url: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub bind: String,

    /// Port to listen on
    pub port: u16,

    /// Largest accepted audio capture in bytes
    pub max_audio_bytes: usize,

    /// Idle time after which a session is discarded (`None` = never)
    pub session_idle: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_audio_bytes: DEFAULT_MAX_AUDIO_BYTES,
            session_idle: Some(Duration::from_secs(DEFAULT_SESSION_IDLE_SECS)),
        }
    }
}

impl Config {
    /// Load configuration from the process environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a required credential is missing or the persona
    /// file cannot be loaded
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(|key| std::env::var(key).ok(), fc)
    }

    /// Resolve configuration from an environment lookup and a parsed file
    ///
    /// Empty environment values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns error if a required credential is missing or the persona
    /// file cannot be loaded
    pub fn from_sources<F>(env: F, fc: JamieConfigFile) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        // Required credentials (env > toml), reported together
        let google_key = env(GOOGLE_API_KEY_ENV).or_else(|| non_empty(fc.api_keys.google));
        let azure_key = env(AZURE_KEY_ENV).or_else(|| non_empty(fc.api_keys.azure_speech));
        let azure_region = env(AZURE_REGION_ENV).or_else(|| non_empty(fc.speech.region));

        let missing: Vec<&str> = [
            (GOOGLE_API_KEY_ENV, google_key.is_none()),
            (AZURE_KEY_ENV, azure_key.is_none()),
            (AZURE_REGION_ENV, azure_region.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (Some(google_key), Some(azure_key), Some(azure_region)) =
            (google_key, azure_key, azure_region)
        else {
            return Err(Error::Config(format!(
                "missing required configuration: {} (set the environment variables or the [api_keys]/[speech] sections of the config file)",
                missing.join(", ")
            )));
        };

        // Persona (env > toml > default)
        let persona_name = env("JAMIE_PERSONA_NAME")
            .or(fc.persona.name)
            .unwrap_or_else(|| DEFAULT_PERSONA_NAME.to_string());
        let persona = match env("JAMIE_PERSONA_FILE").or(fc.persona.file) {
            Some(path) => Persona::from_file(persona_name, &PathBuf::from(path))?,
            None if persona_name == DEFAULT_PERSONA_NAME => Persona::default(),
            None => Persona::new(persona_name, crate::persona::DEFAULT_INSTRUCTION)?,
        };

        let llm = LlmConfig {
            api_key: SecretString::from(google_key),
            model: env("JAMIE_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            base_url: env("JAMIE_LLM_BASE_URL").or(fc.llm.base_url),
        };

        let speech = SpeechConfig {
            api_key: SecretString::from(azure_key),
            region: azure_region,
            voice: env("JAMIE_TTS_VOICE")
                .or(fc.speech.voice)
                .unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string()),
            language: env("JAMIE_SPEECH_LANGUAGE")
                .or(fc.speech.language)
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            stt_base_url: env("JAMIE_STT_BASE_URL").or(fc.speech.stt_base_url),
            tts_base_url: env("JAMIE_TTS_BASE_URL").or(fc.speech.tts_base_url),
        };

        let defaults = ServerConfig::default();
        let session_idle = match parse_env(&env, "JAMIE_SESSION_IDLE_SECS")?
            .or(fc.server.session_idle_secs)
        {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.session_idle,
        };
        let server = ServerConfig {
            bind: env("JAMIE_BIND").or(fc.server.bind).unwrap_or(defaults.bind),
            port: parse_env(&env, "JAMIE_PORT")?
                .or(fc.server.port)
                .unwrap_or(defaults.port),
            max_audio_bytes: parse_env(&env, "JAMIE_MAX_AUDIO_BYTES")?
                .or(fc.server.max_audio_bytes)
                .unwrap_or(defaults.max_audio_bytes),
            session_idle,
        };

        let timeout_secs = parse_env(&env, "JAMIE_GATEWAY_TIMEOUT_SECS")?
            .or(fc.server.gateway_timeout_secs)
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT_SECS);
        let gateway_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        Ok(Self {
            persona,
            llm,
            speech,
            server,
            gateway_timeout,
        })
    }
}

/// Parse an optional numeric environment value
fn parse_env<T, F>(env: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|raw| {
            raw.parse()
                .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}")))
        })
        .transpose()
}
