//! TOML configuration file loading
//!
//! Supports `~/.config/jamie/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct JamieConfigFile {
    /// Generation model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech service configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Persona overrides
    #[serde(default)]
    pub persona: PersonaFileConfig,

    /// Credentials for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Generation model configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LlmFileConfig {
    /// Model identifier (e.g. "gemini-1.5-flash")
    pub model: Option<String>,

    /// Override for the generation API base URL
    pub base_url: Option<String>,
}

/// Speech service configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SpeechFileConfig {
    /// Azure speech region (e.g. "eastus")
    pub region: Option<String>,

    /// Synthesis voice (e.g. "en-US-JennyNeural")
    pub voice: Option<String>,

    /// Recognition and synthesis language (BCP 47)
    pub language: Option<String>,

    /// Override for the recognition endpoint base URL
    pub stt_base_url: Option<String>,

    /// Override for the synthesis endpoint base URL
    pub tts_base_url: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerFileConfig {
    /// Port to listen on
    pub port: Option<u16>,

    /// Address to bind
    pub bind: Option<String>,

    /// Largest accepted audio capture in bytes
    pub max_audio_bytes: Option<usize>,

    /// Per gateway call time bound in seconds (0 disables)
    pub gateway_timeout_secs: Option<u64>,

    /// Seconds a session may sit idle before it is discarded (0 keeps sessions forever)
    pub session_idle_secs: Option<u64>,
}

/// Persona overrides
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PersonaFileConfig {
    /// Assistant display name
    pub name: Option<String>,

    /// Path to a plain text instruction file
    pub file: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiKeysFileConfig {
    /// Google generative language API key
    pub google: Option<String>,

    /// Azure speech subscription key
    pub azure_speech: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `JamieConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> JamieConfigFile {
    config_file_path().map_or_else(JamieConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Returns `JamieConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file_from(path: &Path) -> JamieConfigFile {
    if !path.exists() {
        return JamieConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                JamieConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            JamieConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/jamie/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("jamie").join("config.toml"))
}
