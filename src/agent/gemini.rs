//! Gemini reply generation via the `generateContent` REST endpoint

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::gateway::{ContextEntry, ContextRole, GenerationGateway};
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini text generator
pub struct GeminiGenerator {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    /// Create a new generator for a model
    ///
    /// # Errors
    ///
    /// Returns error if the API key or model is empty
    pub fn new(api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "Google API key required for Gemini".to_string(),
            ));
        }
        if model.trim().is_empty() {
            return Err(Error::Config("Gemini model must not be empty".to_string()));
        }

        Ok(Self {
            client: Client::new(),
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point requests at a different API root
    #[must_use]
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        self
    }
}

/// Build the request body
///
/// The persona instruction travels as the leading `user` content and
/// assistant turns use the `model` role.
fn build_request(context: &[ContextEntry]) -> GenerateContentRequest<'_> {
    let contents = context
        .iter()
        .map(|entry| Content {
            role: match entry.role {
                ContextRole::Instruction | ContextRole::User => "user",
                ContextRole::Assistant => "model",
            },
            parts: vec![Part { text: &entry.text }],
        })
        .collect();

    GenerateContentRequest { contents }
}

/// Pull the reply text out of a response
fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let candidate = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| Error::Generation("Gemini returned no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(Error::Generation(format!(
            "Gemini returned no text (finish reason: {reason})"
        )));
    }

    Ok(text)
}

#[async_trait]
impl GenerationGateway for GeminiGenerator {
    async fn generate(&self, context: &[ContextEntry]) -> Result<String> {
        let request = build_request(context);
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        tracing::debug!(model = %self.model, contents = request.contents.len(), "requesting Gemini reply");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorWrapper>(&body)
                .ok()
                .and_then(|w| w.error.message)
                .unwrap_or(body);
            tracing::error!(status = %status, message = %message, "Gemini API error");
            return Err(Error::Generation(format!("Gemini API error {status}: {message}")));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("failed to parse Gemini response: {e}")))?;

        let text = extract_text(parsed)?;
        tracing::info!(chars = text.len(), "reply generated");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_maps_roles() {
        let context = vec![
            ContextEntry::instruction("You are Jamie."),
            ContextEntry {
                role: ContextRole::User,
                text: "Hello".to_string(),
            },
            ContextEntry {
                role: ContextRole::Assistant,
                text: "Hi!".to_string(),
            },
        ];

        let json = serde_json::to_value(build_request(&context)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "You are Jamie."}]},
                    {"role": "user", "parts": [{"text": "Hello"}]},
                    {"role": "model", "parts": [{"text": "Hi!"}]},
                ]
            })
        );
    }

    #[test]
    fn extracts_concatenated_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hey "}, {"text": "there."}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(extract_text(response).unwrap(), "Hey there.");
    }

    #[test]
    fn blocked_candidate_is_error() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();

        let err = extract_text(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn missing_candidates_is_error() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(extract_text(response), Err(Error::Generation(_))));
    }
}
