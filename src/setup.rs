//! Interactive first-run setup wizard (`jamie setup`)

use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input, Select};

use crate::config::file::{
    ApiKeysFileConfig, JamieConfigFile, LlmFileConfig, PersonaFileConfig, SpeechFileConfig,
};
use crate::config::{
    AZURE_KEY_ENV, DEFAULT_LANGUAGE, DEFAULT_LLM_MODEL, DEFAULT_TTS_VOICE, GOOGLE_API_KEY_ENV,
};
use crate::persona::DEFAULT_PERSONA_NAME;

/// Neural voices offered in the wizard; any Azure voice name works in the file
const VOICES: &[&str] = &[
    "en-US-JennyNeural",
    "en-US-AriaNeural",
    "en-US-GuyNeural",
    "en-GB-SoniaNeural",
    "en-AU-NatashaNeural",
];

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("Jamie Setup\n");

    let existing = crate::config::file::load_config_file();
    let config_path = crate::config::file::config_file_path()
        .unwrap_or_else(|| PathBuf::from("~/.config/jamie/config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. Credentials
    let google = prompt_key("Google API key", GOOGLE_API_KEY_ENV, existing.api_keys.google.as_deref())?;
    let azure_speech = prompt_key(
        "Azure speech key",
        AZURE_KEY_ENV,
        existing.api_keys.azure_speech.as_deref(),
    )?;

    let region: String = Input::new()
        .with_prompt("Azure speech region (e.g. eastus)")
        .with_initial_text(existing.speech.region.clone().unwrap_or_default())
        .validate_with(|input: &String| -> Result<(), &str> {
            if !input.is_empty() && input.chars().all(|c| c.is_ascii_alphanumeric()) {
                Ok(())
            } else {
                Err("region must be letters and digits only")
            }
        })
        .interact_text()?;

    // 2. Voice
    let current_voice = existing.speech.voice.as_deref().unwrap_or(DEFAULT_TTS_VOICE);
    let mut voice_labels: Vec<&str> = VOICES.to_vec();
    if !voice_labels.contains(&current_voice) {
        voice_labels.insert(0, current_voice);
    }
    let voice_idx = Select::new()
        .with_prompt("Select a voice")
        .items(&voice_labels)
        .default(voice_labels.iter().position(|&v| v == current_voice).unwrap_or(0))
        .interact()?;
    let voice = voice_labels[voice_idx].to_string();

    // 3. Model
    let model: String = Input::new()
        .with_prompt("Gemini model")
        .default(
            existing
                .llm
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        )
        .interact_text()?;

    // 4. Persona name
    let persona_name: String = Input::new()
        .with_prompt("Assistant name")
        .default(
            existing
                .persona
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_PERSONA_NAME.to_string()),
        )
        .interact_text()?;

    // 5. Build and write config
    let config_file = JamieConfigFile {
        llm: LlmFileConfig {
            model: Some(model),
            base_url: existing.llm.base_url,
        },
        speech: SpeechFileConfig {
            region: Some(region),
            voice: Some(voice),
            language: Some(
                existing
                    .speech
                    .language
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            ),
            stt_base_url: existing.speech.stt_base_url,
            tts_base_url: existing.speech.tts_base_url,
        },
        server: existing.server,
        persona: PersonaFileConfig {
            name: Some(persona_name),
            file: existing.persona.file,
        },
        api_keys: ApiKeysFileConfig {
            google,
            azure_speech,
        },
    };

    let write = !config_path.exists()
        || Confirm::new()
            .with_prompt("Overwrite the existing config?")
            .default(true)
            .interact()?;

    if !write {
        println!("\nNothing written.");
        return Ok(());
    }

    write_config(&config_path, &config_file)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `jamie serve -v` and open the printed address.");

    Ok(())
}

/// Ask for a key, keeping the existing one when the answer is blank
fn prompt_key(label: &str, env_hint: &str, existing: Option<&str>) -> anyhow::Result<Option<String>> {
    let prompt = existing.map_or_else(
        || format!("{label} ({env_hint})"),
        |k| format!("{label} (current: {}, leave blank to keep)", mask(k)),
    );

    let input: String = Input::new()
        .with_prompt(&prompt)
        .allow_empty(true)
        .interact_text()?;

    Ok(if input.trim().is_empty() {
        existing.map(str::to_string)
    } else {
        Some(input.trim().to_string())
    })
}

/// Show only the ends of a secret
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

/// Serialize and write the config file
fn write_config(path: &Path, config: &JamieConfigFile) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, toml::to_string_pretty(config)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_hides_middle_of_long_keys() {
        assert_eq!(mask("AIzaSyExampleKey1234"), "AIza...1234");
        assert_eq!(mask("short"), "****");
    }

    #[test]
    fn written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = JamieConfigFile {
            speech: SpeechFileConfig {
                region: Some("eastus".to_string()),
                voice: Some("en-US-AriaNeural".to_string()),
                ..SpeechFileConfig::default()
            },
            api_keys: ApiKeysFileConfig {
                google: Some("g-key".to_string()),
                azure_speech: Some("a-key".to_string()),
            },
            ..JamieConfigFile::default()
        };

        write_config(&path, &config).unwrap();
        let loaded = crate::config::file::load_config_file_from(&path);

        assert_eq!(loaded.speech.region.as_deref(), Some("eastus"));
        assert_eq!(loaded.speech.voice.as_deref(), Some("en-US-AriaNeural"));
        assert_eq!(loaded.api_keys.google.as_deref(), Some("g-key"));
        assert!(loaded.llm.model.is_none());
    }
}
