//! Audio playback through an external command-line player
//!
//! Synthesized replies are spooled to a temporary file that exists only for
//! the duration of one playback; the file is removed when the guard drops,
//! on success and failure alike.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::gateway::AudioArtifact;
use crate::{Error, Result};

/// Known players, in order of preference, with their quiet/no-window flags
const PLAYERS: &[(&str, &[&str])] = &[
    ("mpv", &["--no-video", "--really-quiet"]),
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
    ("afplay", &[]),
    ("mpg123", &["-q"]),
];

/// Temporary audio file deleted on drop
#[derive(Debug)]
pub struct ScopedAudioFile {
    file: NamedTempFile,
}

impl ScopedAudioFile {
    /// Write audio bytes to a fresh temporary file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written
    pub fn write(bytes: &[u8], mime_type: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("jamie-")
            .suffix(extension_for(mime_type))
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        tracing::trace!(path = %file.path().display(), "spooled audio");
        Ok(Self { file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mpeg" | "audio/mp3" => ".mp3",
        "audio/wav" | "audio/x-wav" => ".wav",
        _ => ".bin",
    }
}

/// Plays artifacts by invoking an installed player
#[derive(Debug, Clone)]
pub struct AudioPlayback {
    program: PathBuf,
    args: Vec<OsString>,
}

impl AudioPlayback {
    /// Find the first known player on `PATH`
    ///
    /// # Errors
    ///
    /// Returns error if none of the known players is installed
    pub fn detect() -> Result<Self> {
        for (name, args) in PLAYERS {
            if let Ok(program) = which::which(name) {
                tracing::debug!(player = %program.display(), "audio player found");
                return Ok(Self::with_program(program, args.iter().map(OsString::from).collect()));
            }
        }

        let names: Vec<&str> = PLAYERS.iter().map(|(name, _)| *name).collect();
        Err(Error::Audio(format!(
            "no audio player found (install one of: {})",
            names.join(", ")
        )))
    }

    /// Use an explicit player program and leading arguments
    #[must_use]
    pub const fn with_program(program: PathBuf, args: Vec<OsString>) -> Self {
        Self { program, args }
    }

    /// Play an artifact to completion
    ///
    /// # Errors
    ///
    /// Returns error if spooling fails, the player cannot start, or it exits unsuccessfully
    pub async fn play(&self, artifact: &AudioArtifact) -> Result<()> {
        let spool = ScopedAudioFile::write(&artifact.bytes, &artifact.mime_type)?;

        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(spool.path())
            .stdin(std::process::Stdio::null())
            .status()
            .await?;

        if !status.success() {
            return Err(Error::Audio(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }

        Ok(())
    }
}
