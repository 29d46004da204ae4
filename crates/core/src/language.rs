//! Language Responder
//!
//! Wraps a single, non-streaming `generateContent` call to the language
//! provider. The responder formats the request with a fixed set of
//! content-safety settings and pulls the first candidate's text out of the
//! reply.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, error, warn};

/// The language provider's public API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Returned in place of a reply when the provider answered but produced no text.
pub const FALLBACK_REPLY: &str = "Could not generate a response.";

/// Harm categories blocked at medium probability and above.
const BLOCKED_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const BLOCK_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Failures talking to the language provider.
#[derive(Debug, thiserror::Error)]
pub enum LanguageError {
    /// Transport failure, timeout, or a non-success status. The request URL
    /// is stripped since it carries the API key.
    #[error("Error calling language provider: {0}")]
    Network(#[source] reqwest::Error),
    /// The provider answered with something that is not JSON.
    #[error("Error decoding language provider response: {0}")]
    Decode(String),
    #[error("Unexpected error generating a response: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for LanguageError {
    fn from(err: reqwest::Error) -> Self {
        LanguageError::Network(err.without_url())
    }
}

/// Connection settings for the language provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageProviderSettings {
    /// Sent as the `key` query parameter. `None` means unset.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for LanguageProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Something that can turn a prompt into a natural-language reply.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageResponder: Send + Sync {
    /// Makes a single call to the provider. Callers must reject empty prompts
    /// before calling this.
    ///
    /// On success the reply is trimmed and never empty: when the provider
    /// produces no usable text, [`FALLBACK_REPLY`] is returned instead.
    async fn respond(&self, prompt: &str) -> Result<String, LanguageError>;
}

/// Builds the prompt for the direct chat endpoint, pinning the reply to
/// `language`.
pub fn chat_prompt(message: &str, language: &str) -> String {
    format!(
        "User message: '{message}'. As an AI receptionist, respond ONLY in {language}. \
         Ensure your entire response is in {language}."
    )
}

// --- Wire types for the generateContent endpoint ---
mod wire {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct GenerateContentRequest<'a> {
        pub contents: Vec<Content<'a>>,
        pub safety_settings: Vec<SafetySetting>,
    }
    #[derive(Serialize)]
    pub(super) struct Content<'a> {
        pub parts: Vec<Part<'a>>,
    }
    #[derive(Serialize)]
    pub(super) struct Part<'a> {
        pub text: &'a str,
    }
    #[derive(Serialize)]
    pub(super) struct SafetySetting {
        pub category: &'static str,
        pub threshold: &'static str,
    }

    #[derive(Deserialize, Default, Debug)]
    #[serde(default)]
    pub(super) struct GenerateContentResponse {
        pub candidates: Vec<Candidate>,
    }
    #[derive(Deserialize, Default, Debug)]
    #[serde(default)]
    pub(super) struct Candidate {
        pub content: CandidateContent,
    }
    #[derive(Deserialize, Default, Debug)]
    #[serde(default)]
    pub(super) struct CandidateContent {
        pub parts: Vec<CandidatePart>,
    }
    #[derive(Deserialize, Default, Debug)]
    #[serde(default)]
    pub(super) struct CandidatePart {
        pub text: Option<String>,
    }
}

/// A [`LanguageResponder`] backed by the Gemini `generateContent` REST API.
pub struct GeminiResponder {
    client: Client,
    settings: LanguageProviderSettings,
}

impl GeminiResponder {
    /// Creates a responder. The `client` carries the request timeout.
    pub fn new(client: Client, settings: LanguageProviderSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self) -> Result<Url, LanguageError> {
        let base = format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        );
        let parsed = match &self.settings.api_key {
            Some(key) => Url::parse_with_params(&base, &[("key", key)]),
            None => Url::parse(&base),
        };
        parsed.map_err(|e| LanguageError::Unexpected(format!("invalid endpoint '{base}': {e}")))
    }

    async fn generate(&self, prompt: &str) -> Result<String, LanguageError> {
        if self.settings.api_key.is_none() {
            error!("Language provider API key is not set. The request will be rejected.");
        }

        let request = wire::GenerateContentRequest {
            contents: vec![wire::Content {
                parts: vec![wire::Part { text: prompt }],
            }],
            safety_settings: BLOCKED_CATEGORIES
                .iter()
                .map(|&category| wire::SafetySetting {
                    category,
                    threshold: BLOCK_THRESHOLD,
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.endpoint()?)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            LanguageError::Decode(format!("{e}. Response text: {}", crate::preview(&body, 200)))
        })?;

        Ok(extract_reply(value))
    }
}

/// Pulls `candidates[0].content.parts[0].text` out of a provider reply,
/// falling back to [`FALLBACK_REPLY`] when it is missing or blank.
fn extract_reply(value: Value) -> String {
    let text = serde_json::from_value::<wire::GenerateContentResponse>(value.clone())
        .ok()
        .and_then(|response| response.candidates.into_iter().next())
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .and_then(|part| part.text)
        .map(|text| text.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        warn!(response = %value, "Language provider returned an empty response");
        return FALLBACK_REPLY.to_string();
    }
    text
}

#[async_trait]
impl LanguageResponder for GeminiResponder {
    async fn respond(&self, prompt: &str) -> Result<String, LanguageError> {
        debug!(model = %self.settings.model, "Sending prompt to language provider");
        self.generate(prompt).await.inspect_err(|e| {
            error!(error = %e, "Failed to get a response from the language provider");
        })
    }
}
