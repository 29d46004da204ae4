//! Typed call-lifecycle events posted by the voice provider.
//!
//! The provider sends a flat JSON object with a discriminator (`event`, or
//! `type` on older payloads) and a handful of tag-specific fields. Each
//! known tag decodes into its own payload struct; unknown fields are
//! ignored and every field is optional, so a sparse event still decodes.
//!
//! Only the fields the dispatcher acts on (`call_id`, `transcription`) must
//! have the right type. Fields that are only logged are dropped when the
//! provider sends something unexpected, so one odd value never costs the
//! rest of the event.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Failure turning a webhook body into a [`WebhookEvent`].
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("webhook body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("webhook body is not a JSON object")]
    NotAnObject,
    #[error("malformed '{tag}' event: {source}")]
    Malformed {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Transcription {
    pub call_id: Option<String>,
    pub transcription: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CallEnded {
    pub call_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub summary: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub direction: Option<String>,
    /// Seconds.
    #[serde(deserialize_with = "lenient")]
    pub duration: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub cost: Option<f64>,
    /// Provider failure reason, e.g. `failed_to_connect`. Kept as raw JSON
    /// since it is sometimes an object.
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CallInitiated {
    pub call_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub to: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub from: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Speak {
    pub call_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderFault {
    pub call_id: Option<String>,
    /// Numeric or symbolic, depending on the failure.
    pub code: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    pub message: Option<String>,
}

/// One webhook delivery from the voice provider.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    Transcription(Transcription),
    CallEnded(CallEnded),
    CallInitiated(CallInitiated),
    SpeakStarted(Speak),
    SpeakEnded(Speak),
    Error(ProviderFault),
    /// A tag this service has no handler for, or `None` when the body had
    /// no discriminator at all.
    Unknown(Option<String>),
}

impl WebhookEvent {
    /// Decodes a raw webhook body.
    pub fn from_slice(body: &[u8]) -> Result<Self, EventError> {
        let value: Value = serde_json::from_slice(body).map_err(EventError::InvalidJson)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, EventError> {
        let object = value.as_object().ok_or(EventError::NotAnObject)?;
        let tag = ["event", "type"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .map(str::to_string);

        let Some(tag) = tag else {
            return Ok(WebhookEvent::Unknown(None));
        };

        let event = match tag.as_str() {
            "transcription" => WebhookEvent::Transcription(decode(&tag, value)?),
            "call.ended" => WebhookEvent::CallEnded(decode(&tag, value)?),
            "call.initiated" => WebhookEvent::CallInitiated(decode(&tag, value)?),
            "speak.started" => WebhookEvent::SpeakStarted(decode(&tag, value)?),
            "speak.ended" => WebhookEvent::SpeakEnded(decode(&tag, value)?),
            "error" => WebhookEvent::Error(decode(&tag, value)?),
            _ => WebhookEvent::Unknown(Some(tag)),
        };
        Ok(event)
    }

    /// The discriminator as the provider sent it.
    pub fn tag(&self) -> &str {
        match self {
            WebhookEvent::Transcription(_) => "transcription",
            WebhookEvent::CallEnded(_) => "call.ended",
            WebhookEvent::CallInitiated(_) => "call.initiated",
            WebhookEvent::SpeakStarted(_) => "speak.started",
            WebhookEvent::SpeakEnded(_) => "speak.ended",
            WebhookEvent::Error(_) => "error",
            WebhookEvent::Unknown(tag) => tag.as_deref().unwrap_or("<none>"),
        }
    }
}

/// Decodes an optional log-only field, yielding `None` on a type mismatch.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

fn decode<T: DeserializeOwned>(tag: &str, value: Value) -> Result<T, EventError> {
    serde_json::from_value(value).map_err(|source| EventError::Malformed {
        tag: tag.to_string(),
        source,
    })
}
