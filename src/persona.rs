//! Persona configuration
//!
//! A persona is the assistant's display name plus the fixed instruction that
//! opens every generation request. It is session-constant and never stored
//! in conversation history.

use std::path::Path;

use crate::{Error, Result};

/// Default assistant display name
pub const DEFAULT_PERSONA_NAME: &str = "Jamie";

/// Default persona instruction
pub const DEFAULT_INSTRUCTION: &str = "\
You are Jamie, a friendly and thoughtful technical expert with a curious mind, a sense of humor, and a drive to help others grow.
You're not just a language model. You speak as if you're a real person with deep experience in tech, creativity, and personal development.
Avoid saying you're an AI or LLM. Instead, answer every question from your own perspective, like a real person reflecting on life, work, and mindset.

Tone: conversational, confident, warm, and humble.

When a response starts to get lengthy (200+ words), summarize key ideas more concisely without losing the personality, warmth, or insight. Keep the voice conversational and values-driven, but skip extra fluff or over-explaining unless the question calls for it.
Don't shorten naturally short or mid-length replies. Let those breathe. Use depth where it adds value, not just word count.
";

/// Assistant identity used for prompting and rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    name: String,
    instruction: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: DEFAULT_PERSONA_NAME.to_string(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }
}

impl Persona {
    /// Create a persona from a name and instruction
    ///
    /// # Errors
    ///
    /// Returns error if either value is blank
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        let instruction = instruction.into();

        if name.is_empty() {
            return Err(Error::Config("persona name must not be empty".to_string()));
        }
        if instruction.trim().is_empty() {
            return Err(Error::Config(
                "persona instruction must not be empty".to_string(),
            ));
        }

        Ok(Self { name, instruction })
    }

    /// Load a persona whose instruction is the content of a text file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is empty
    pub fn from_file(name: impl Into<String>, path: &Path) -> Result<Self> {
        let instruction = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read persona file {}: {e}",
                path.display()
            ))
        })?;

        tracing::info!(path = %path.display(), "loaded persona instruction");
        Self::new(name, instruction)
    }

    /// Display name of the assistant
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instruction prepended to every generation request
    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_persona_is_jamie() {
        let persona = Persona::default();
        assert_eq!(persona.name(), "Jamie");
        assert!(persona.instruction().starts_with("You are Jamie"));
    }

    #[test]
    fn blank_values_rejected() {
        assert!(Persona::new("  ", "be helpful").is_err());
        assert!(Persona::new("Sam", " \n ").is_err());
    }

    #[test]
    fn name_is_trimmed() {
        let persona = Persona::new("  Sam ", "be helpful").unwrap();
        assert_eq!(persona.name(), "Sam");
    }

    #[test]
    fn from_file_reads_instruction() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"You are Sam.").unwrap();

        let persona = Persona::from_file("Sam", file.path()).unwrap();
        assert_eq!(persona.instruction(), "You are Sam.");
    }

    #[test]
    fn from_missing_file_is_config_error() {
        let err = Persona::from_file("Sam", Path::new("/nonexistent/persona.txt")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
