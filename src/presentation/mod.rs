//! Rendering of conversation state
//!
//! Adapters only display what the controller recorded: the transcript in
//! order and one autoplaying audio element for the latest reply. The
//! browser page consumes [`TranscriptView`] as JSON; the terminal chat
//! prints it with [`TranscriptView::memory_lines`].

mod page;

use std::fmt::Write as _;

use base64::Engine;
use chrono::{DateTime, Utc};
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::conversation::{ConversationStore, Speaker};
use crate::gateway::AudioArtifact;

pub use page::INDEX_HTML;

/// Label shown for user turns
pub const USER_LABEL: &str = "You";

/// One rendered turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub label: String,
    pub text: String,
    /// When the turn was recorded, shown next to the bubble
    pub at: DateTime<Utc>,
}

/// Inline audio as a base64 data URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioEmbed {
    pub mime_type: String,
    pub data_uri: String,
}

impl AudioEmbed {
    #[must_use]
    pub fn from_artifact(artifact: &AudioArtifact) -> Self {
        let encoded = STANDARD.encode(&artifact.bytes);
        Self {
            mime_type: artifact.mime_type.clone(),
            data_uri: format!("data:{};base64,{encoded}", artifact.mime_type),
        }
    }

    /// Autoplaying `<audio>` element
    #[must_use]
    pub fn to_html(&self) -> String {
        format!(
            r#"<audio autoplay><source src="{}" type="{}"></audio>"#,
            self.data_uri, self.mime_type
        )
    }
}

/// Everything an adapter needs to draw one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptView {
    pub persona: String,
    pub entries: Vec<TranscriptEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioEmbed>,
}

impl TranscriptView {
    /// Render history, attaching the latest reply audio if there is one
    #[must_use]
    pub fn render(history: &ConversationStore, persona: &str, audio: Option<&AudioArtifact>) -> Self {
        let entries = history
            .all()
            .iter()
            .map(|turn| TranscriptEntry {
                speaker: turn.speaker(),
                label: match turn.speaker() {
                    Speaker::User => USER_LABEL.to_string(),
                    Speaker::Assistant => persona.to_string(),
                },
                text: turn.text().to_string(),
                at: turn.created_at(),
            })
            .collect();

        Self {
            persona: persona.to_string(),
            entries,
            audio: audio.map(AudioEmbed::from_artifact),
        }
    }

    /// `Label: text` lines for the conversation memory section
    #[must_use]
    pub fn memory_lines(&self) -> String {
        self.entries.iter().fold(String::new(), |mut out, entry| {
            let _ = writeln!(out, "{}: {}", entry.label, entry.text);
            out
        })
    }
}
