//! Settings and error-body decoding shared by the voice-provider clients.
//!
//! Both the [`crate::call`] controller and the [`crate::speech`] relay talk
//! to the same REST API with the same bearer credentials, so the pieces they
//! share live here.

use reqwest::{RequestBuilder, Url};
use serde_json::Value;

/// The voice provider's public API root.
pub const DEFAULT_BASE_URL: &str = "https://api.bland.ai/v1";

/// Placeholder webhook target used when none is configured. Calls started
/// with it will never deliver transcriptions back to this service.
pub const DEFAULT_WEBHOOK_URL: &str = "https://example.com/bland_ai_webhook";

/// Connection settings for the voice provider, built once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceProviderSettings {
    /// Bearer token. `None` means the service has not been given one yet.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Provider-side flow (pathway) that controls call behaviour.
    pub flow_id: Option<String>,
    /// Where the provider should POST call lifecycle events.
    pub webhook_url: String,
    /// Optional caller id for outbound calls.
    pub from_number: Option<String>,
}

impl Default for VoiceProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            flow_id: None,
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            from_number: None,
        }
    }
}

impl VoiceProviderSettings {
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Builds `{base}/calls/{call_id}[/{action}]`, escaping the id as a
    /// single path segment. Dot segments are refused because URL
    /// normalisation would drop them and address the collection instead.
    pub(crate) fn call_endpoint(&self, call_id: &str, action: Option<&str>) -> Result<Url, String> {
        if matches!(call_id, "" | "." | "..") {
            return Err(format!("'{call_id}' is not a valid call id"));
        }
        let mut url = Url::parse(&self.endpoint("calls"))
            .map_err(|e| format!("invalid voice provider base URL '{}': {e}", self.base_url))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| format!("voice provider base URL '{}' cannot have a path", self.base_url))?;
            segments.push(call_id);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    /// Attaches the bearer token if one is configured.
    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

/// The useful parts of a structured error body returned by the voice provider.
///
/// The provider reports failures either as `{"message": "..."}`, as
/// `{"error": "..."}`, or as `{"error": ["...", "..."]}` for field
/// validation failures.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ProviderErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl ProviderErrorBody {
    /// Returns `None` when the body is not a JSON object.
    pub(crate) fn parse(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body).ok()?;
        let object = value.as_object()?;

        let mut parsed = Self {
            message: object.get("message").map(value_text),
            ..Self::default()
        };
        match object.get("error") {
            Some(Value::Array(items)) => {
                parsed.errors = Some(items.iter().map(value_text).collect());
            }
            Some(Value::Null) | None => {}
            Some(other) => parsed.error = Some(value_text(other)),
        }
        Some(parsed)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
