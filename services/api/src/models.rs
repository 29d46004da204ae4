//! API Models
//!
//! Request and response bodies for the HTTP surface, annotated with
//! `utoipa` so they appear in the generated OpenAPI document.
//!
//! Required fields are still `Option` here: a missing field must produce our
//! own 400 body, not the extractor's rejection.

use receptionist_core::call::CallRequest;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Default reply language for `/chat`.
pub const DEFAULT_CHAT_LANGUAGE: &str = "en";

#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct StartCallPayload {
    #[schema(example = "+15551234567")]
    pub phone_number: Option<String>,
    #[schema(example = "June")]
    pub voice: Option<String>,
    pub record: Option<bool>,
    #[schema(example = "en")]
    pub language: Option<String>,
    #[schema(example = "AI Receptionist Inquiry")]
    pub task: Option<String>,
}

impl StartCallPayload {
    /// Builds a [`CallRequest`], or `None` when no phone number was given.
    pub fn into_call_request(self) -> Option<CallRequest> {
        let phone_number = self.phone_number.filter(|n| !n.trim().is_empty())?;
        let mut request = CallRequest::new(phone_number.trim());
        if let Some(voice) = self.voice {
            request.voice = voice;
        }
        if let Some(record) = self.record {
            request.record = record;
        }
        if let Some(language) = self.language {
            request.language = language;
        }
        if let Some(task) = self.task {
            request.task = task;
        }
        Some(request)
    }
}

#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct EndCallPayload {
    #[schema(example = "c1a3e0b2-6f0d-4f8e-9a51-2d7b1c3f4e5a")]
    pub call_id: Option<String>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct EndCallResponse {
    #[schema(example = "success")]
    pub status: String,
    pub message: String,
}

#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct ChatPayload {
    #[schema(example = "What time do you open on Saturdays?")]
    pub message: Option<String>,
    #[schema(example = "en")]
    pub language: Option<String>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ChatResponse {
    pub response: String,
    pub language: String,
}

/// Acknowledgement sent back to the voice provider for every webhook.
#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct WebhookAck {
    #[schema(example = "success")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookAck {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
        }
    }

    pub fn error() -> Self {
        Self {
            status: "error".to_string(),
            message: Some("Internal server error processing webhook".to_string()),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_call_payload_defaults() {
        let payload: StartCallPayload =
            serde_json::from_str(r#"{"phone_number": " +15551234567 "}"#).unwrap();
        let request = payload.into_call_request().expect("phone number present");

        assert_eq!(request, CallRequest::new("+15551234567"));
        assert_eq!(request.voice, "June");
        assert!(request.record);
        assert_eq!(request.language, "en");
        assert_eq!(request.task, "AI Receptionist Inquiry");
    }

    #[test]
    fn test_start_call_payload_overrides() {
        let payload: StartCallPayload = serde_json::from_str(
            r#"{"phone_number": "+34600000000", "voice": "Sarah", "record": false, "language": "es", "task": "Reservas"}"#,
        )
        .unwrap();
        let request = payload.into_call_request().unwrap();

        assert_eq!(request.voice, "Sarah");
        assert!(!request.record);
        assert_eq!(request.language, "es");
        assert_eq!(request.task, "Reservas");
    }

    #[test]
    fn test_start_call_payload_without_number() {
        let missing: StartCallPayload = serde_json::from_str("{}").unwrap();
        assert!(missing.into_call_request().is_none());

        let blank: StartCallPayload = serde_json::from_str(r#"{"phone_number": "  "}"#).unwrap();
        assert!(blank.into_call_request().is_none());
    }

    #[test]
    fn test_webhook_ack_serialization() {
        assert_eq!(
            serde_json::to_string(&WebhookAck::success()).unwrap(),
            r#"{"status":"success"}"#
        );
        assert_eq!(
            serde_json::to_string(&WebhookAck::error()).unwrap(),
            r#"{"status":"error","message":"Internal server error processing webhook"}"#
        );
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            error: "Phone number is required".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&error).unwrap(),
            r#"{"error":"Phone number is required"}"#
        );
    }
}
