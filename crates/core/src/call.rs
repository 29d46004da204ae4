//! Call Controller
//!
//! Starts and ends outbound phone calls on the voice provider. Configuration
//! preconditions are checked before any request leaves the process, and
//! provider failures are mapped into [`CallError`] variants.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::preview;
use crate::voice::{DEFAULT_WEBHOOK_URL, ProviderErrorBody, VoiceProviderSettings};

pub const DEFAULT_VOICE: &str = "June";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_TASK: &str = "AI Receptionist Inquiry";

/// Longest slice of a raw provider body carried into an error message.
const RAW_BODY_PREVIEW: usize = 100;

/// Failures starting or ending a call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// Missing credentials or an insecure webhook URL. Raised before any
    /// request is sent.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// No response was received from the provider.
    #[error("Request to voice provider failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// The provider rejected one or more request fields.
    #[error("{message}")]
    InvalidParameters { status: u16, message: String },
    #[error("{message}")]
    Provider { status: u16, message: String },
    /// The provider failed with a body we could not interpret.
    #[error("{message}")]
    UnknownProvider { status: u16, message: String },
    #[error("Error decoding voice provider response: {0}")]
    Decode(String),
}

impl CallError {
    /// The provider's HTTP status, when the failure came from a provider response.
    pub fn status(&self) -> Option<u16> {
        match self {
            CallError::InvalidParameters { status, .. }
            | CallError::Provider { status, .. }
            | CallError::UnknownProvider { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Parameters for a new outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub phone_number: String,
    pub voice: String,
    pub record: bool,
    pub language: String,
    /// Instructions for the provider-side agent.
    pub task: String,
}

impl CallRequest {
    /// A request for `phone_number` with the receptionist defaults.
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            voice: DEFAULT_VOICE.to_string(),
            record: true,
            language: DEFAULT_LANGUAGE.to_string(),
            task: DEFAULT_TASK.to_string(),
        }
    }
}

/// A call the provider accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct CallInfo {
    pub call_id: String,
    /// The provider's full response body.
    pub payload: Value,
}

/// Acknowledgement that the provider accepted an end-call request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndCallAck {
    pub call_id: String,
    pub message: String,
}

/// Issues call-start and call-end commands to the voice provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallController: Send + Sync {
    async fn start_call(&self, request: &CallRequest) -> Result<CallInfo, CallError>;
    async fn end_call(&self, call_id: &str) -> Result<EndCallAck, CallError>;
}

#[derive(Serialize)]
struct CreateCallBody<'a> {
    phone_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    flow_uuid: Option<&'a str>,
    #[serde(rename = "from", skip_serializing_if = "Option::is_none")]
    from_number: Option<&'a str>,
    wait_for_greeting: bool,
    reduce_latency: bool,
    webhook: &'a str,
    task: &'a str,
    voice: &'a str,
    record: bool,
    language: &'a str,
}

/// A [`CallController`] for the Bland AI REST API.
pub struct BlandCallController {
    client: Client,
    settings: VoiceProviderSettings,
}

impl BlandCallController {
    pub fn new(client: Client, settings: VoiceProviderSettings) -> Self {
        Self { client, settings }
    }

    /// Checks the configured webhook URL. It must be an absolute `https` URL.
    fn validated_webhook_url(&self) -> Result<&str, CallError> {
        let webhook_url = self.settings.webhook_url.as_str();
        let secure = reqwest::Url::parse(webhook_url)
            .map(|url| url.scheme() == "https")
            .unwrap_or(false);
        if !secure {
            error!(webhook_url, "Voice provider webhook URL must start with https://");
            return Err(CallError::Configuration(format!(
                "Webhook URL must start with https://. Current URL: {webhook_url}"
            )));
        }
        if webhook_url == DEFAULT_WEBHOOK_URL {
            warn!(
                webhook_url,
                "Webhook URL is the built-in placeholder. Call events will not reach this service."
            );
        }
        Ok(webhook_url)
    }
}

#[async_trait]
impl CallController for BlandCallController {
    async fn start_call(&self, request: &CallRequest) -> Result<CallInfo, CallError> {
        let webhook = self.validated_webhook_url()?;
        if self.settings.api_key.is_none() {
            warn!("Voice provider API key is not set. The provider will reject this call.");
        }
        if self.settings.flow_id.is_none() {
            warn!("Voice provider flow id is not set. The call may use a default flow.");
        }

        let body = CreateCallBody {
            phone_number: &request.phone_number,
            flow_uuid: self.settings.flow_id.as_deref(),
            from_number: self.settings.from_number.as_deref(),
            wait_for_greeting: true,
            reduce_latency: true,
            webhook,
            task: &request.task,
            voice: &request.voice,
            record: request.record,
            language: &request.language,
        };

        info!(
            phone_number = %request.phone_number,
            task = %request.task,
            voice = %request.voice,
            record = request.record,
            language = %request.language,
            webhook,
            "Starting call"
        );

        let response = self
            .settings
            .authorize(self.client.post(self.settings.endpoint("calls")))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Start call request failed");
                CallError::Transport(e)
            })?;
        let status = response.status();
        let text = response.text().await.map_err(CallError::Transport)?;

        if !status.is_success() {
            error!(status = status.as_u16(), response = %text, "Voice provider rejected start call");
            return Err(start_call_failure(status.as_u16(), &text));
        }

        let payload: Value = serde_json::from_str(&text).map_err(|e| {
            CallError::Decode(format!("{e}. Response: {}", preview(&text, RAW_BODY_PREVIEW)))
        })?;
        let call_id = payload
            .get("call_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                error!(response = %payload, "Start call response had no call_id");
                CallError::Decode("Failed to get call ID from voice provider response".to_string())
            })?;

        info!(call_id = %call_id, "Call initiated successfully");
        Ok(CallInfo { call_id, payload })
    }

    async fn end_call(&self, call_id: &str) -> Result<EndCallAck, CallError> {
        if self.settings.api_key.is_none() {
            return Err(CallError::Configuration(
                "Voice provider API key is not set. Cannot end call.".to_string(),
            ));
        }
        let url = self
            .settings
            .call_endpoint(call_id, None)
            .map_err(CallError::Configuration)?;

        info!(call_id, "Sending end call request");
        let response = self
            .settings
            .authorize(self.client.delete(url))
            .send()
            .await
            .map_err(|e| {
                error!(call_id, error = %e, "End call request failed");
                CallError::Transport(e)
            })?;

        let status = response.status();
        if status == StatusCode::OK {
            info!(call_id, "End call request accepted");
            return Ok(EndCallAck {
                call_id: call_id.to_string(),
                message: format!("Call {call_id} end signal sent."),
            });
        }

        let text = response.text().await.unwrap_or_default();
        let failure = end_call_failure(call_id, status.as_u16(), &text);
        error!(call_id, status = status.as_u16(), "{failure}");
        Err(failure)
    }
}

fn start_call_failure(status: u16, body: &str) -> CallError {
    let prefix = format!("Error starting call: Status {status}");
    match ProviderErrorBody::parse(body) {
        Some(ProviderErrorBody {
            errors: Some(errors),
            ..
        }) => CallError::InvalidParameters {
            status,
            message: format!("{prefix} - Invalid parameters. Error: {}", errors.join(", ")),
        },
        Some(ProviderErrorBody {
            message: Some(message),
            ..
        }) => CallError::Provider {
            status,
            message: format!("{prefix} - {message}"),
        },
        Some(_) => CallError::UnknownProvider {
            status,
            message: format!("{prefix} - {}", preview(body, RAW_BODY_PREVIEW)),
        },
        None => CallError::UnknownProvider {
            status,
            message: format!(
                "{prefix} - Non-JSON response: {}...",
                preview(body, RAW_BODY_PREVIEW)
            ),
        },
    }
}

fn end_call_failure(call_id: &str, status: u16, body: &str) -> CallError {
    let mut message = format!("Voice provider error ending call {call_id}: Status {status}");
    match ProviderErrorBody::parse(body) {
        Some(parsed) => {
            if let Some(detail) = parsed.message {
                message.push_str(&format!(" - {detail}"));
            } else if let Some(errors) = parsed.errors {
                message.push_str(&format!(" - Errors: {}", errors.join(", ")));
            } else if let Some(detail) = parsed.error {
                message.push_str(&format!(" - Error: {detail}"));
            }
        }
        None => message.push_str(&format!(
            " - Response: {}...",
            preview(body, RAW_BODY_PREVIEW)
        )),
    }
    CallError::Provider { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> VoiceProviderSettings {
        VoiceProviderSettings {
            api_key: Some("voice-key".to_string()),
            base_url: server.uri(),
            flow_id: Some("flow-123".to_string()),
            webhook_url: "https://receptionist.test/bland_ai_webhook".to_string(),
            from_number: None,
        }
    }

    fn controller(settings: VoiceProviderSettings) -> BlandCallController {
        BlandCallController::new(Client::new(), settings)
    }

    #[tokio::test]
    async fn test_start_call_sends_expected_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calls"))
            .and(header("authorization", "Bearer voice-key"))
            .and(body_partial_json(json!({
                "phone_number": "+15551234567",
                "flow_uuid": "flow-123",
                "wait_for_greeting": true,
                "reduce_latency": true,
                "webhook": "https://receptionist.test/bland_ai_webhook",
                "task": "AI Receptionist Inquiry",
                "voice": "June",
                "record": true,
                "language": "en"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "call_id": "call-abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let info = controller(settings(&server))
            .start_call(&CallRequest::new("+15551234567"))
            .await
            .expect("call started");
        assert_eq!(info.call_id, "call-abc");
        assert_eq!(info.payload["status"], "success");
    }

    #[tokio::test]
    async fn test_start_call_rejects_insecure_webhook_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut settings = settings(&server);
        settings.webhook_url = "http://receptionist.test/bland_ai_webhook".to_string();

        let err = controller(settings)
            .start_call(&CallRequest::new("+15551234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Configuration(_)));
        assert!(err.to_string().contains("https://"));
    }

    #[tokio::test]
    async fn test_start_call_joins_field_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calls"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": ["bad number", "missing flow"]
            })))
            .mount(&server)
            .await;

        let err = controller(settings(&server))
            .start_call(&CallRequest::new("123"))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::InvalidParameters { status: 400, .. }));
        let message = err.to_string();
        assert!(message.contains("bad number"));
        assert!(message.contains("missing flow"));
    }

    #[tokio::test]
    async fn test_start_call_single_message_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(402).set_body_json(json!({ "message": "Insufficient balance" })),
            )
            .mount(&server)
            .await;

        let err = controller(settings(&server))
            .start_call(&CallRequest::new("+15551234567"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(402));
        assert_eq!(
            err.to_string(),
            "Error starting call: Status 402 - Insufficient balance"
        );
    }

    #[tokio::test]
    async fn test_start_call_non_json_failure_is_truncated() {
        let server = MockServer::start().await;
        let body = "x".repeat(500);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string(body))
            .mount(&server)
            .await;

        let err = controller(settings(&server))
            .start_call(&CallRequest::new("+15551234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::UnknownProvider { status: 502, .. }));
        assert!(err.to_string().contains(&"x".repeat(100)));
        assert!(!err.to_string().contains(&"x".repeat(101)));
    }

    #[tokio::test]
    async fn test_start_call_unrecognised_object_is_unknown_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calls"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "x" })))
            .mount(&server)
            .await;

        let err = controller(settings(&server))
            .start_call(&CallRequest::new("+15551234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::UnknownProvider { status: 500, .. }));
        assert_eq!(
            err.to_string(),
            r#"Error starting call: Status 500 - {"detail":"x"}"#
        );
    }

    #[tokio::test]
    async fn test_start_call_without_key_still_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calls"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Unauthorized" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = settings(&server);
        settings.api_key = None;

        let err = controller(settings)
            .start_call(&CallRequest::new("+15551234567"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_start_call_missing_call_id_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "queued" })))
            .mount(&server)
            .await;

        let err = controller(settings(&server))
            .start_call(&CallRequest::new("+15551234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Decode(_)));
    }

    #[tokio::test]
    async fn test_start_call_unreachable_provider_is_transport_error() {
        let settings = VoiceProviderSettings {
            api_key: Some("voice-key".to_string()),
            base_url: "http://127.0.0.1:1".to_string(),
            webhook_url: "https://receptionist.test/hook".to_string(),
            ..Default::default()
        };
        let err = controller(settings)
            .start_call(&CallRequest::new("+15551234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Transport(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_end_call_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calls/call-abc"))
            .and(header("authorization", "Bearer voice-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
            .expect(1)
            .mount(&server)
            .await;

        let ack = controller(settings(&server))
            .end_call("call-abc")
            .await
            .expect("call ended");
        assert_eq!(ack.call_id, "call-abc");
        assert_eq!(ack.message, "Call call-abc end signal sent.");
    }

    #[tokio::test]
    async fn test_end_call_without_key_never_sends() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut settings = settings(&server);
        settings.api_key = None;

        let err = controller(settings).end_call("call-abc").await.unwrap_err();
        assert!(matches!(err, CallError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_end_call_unreachable_provider_is_transport_error() {
        let settings = VoiceProviderSettings {
            api_key: Some("voice-key".to_string()),
            base_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        };
        let err = controller(settings).end_call("call-abc").await.unwrap_err();
        assert!(matches!(err, CallError::Transport(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_end_call_rejects_dot_segment_ids_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let controller = controller(settings(&server));
        for call_id in [".", ".."] {
            let err = controller.end_call(call_id).await.unwrap_err();
            assert!(matches!(err, CallError::Configuration(_)), "{call_id:?}");
        }
    }

    #[tokio::test]
    async fn test_end_call_keeps_provider_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calls/unknown"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "Call not found" })),
            )
            .mount(&server)
            .await;

        let err = controller(settings(&server))
            .end_call("unknown")
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Provider { status: 404, .. }));
        assert_eq!(
            err.to_string(),
            "Voice provider error ending call unknown: Status 404 - Call not found"
        );
    }

    #[tokio::test]
    async fn test_end_call_error_list_and_raw_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calls/listed"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": ["call already ended", "no active session"]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/calls/raw"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let controller = controller(settings(&server));

        let listed = controller.end_call("listed").await.unwrap_err();
        assert!(
            listed
                .to_string()
                .ends_with("Errors: call already ended, no active session")
        );

        let raw = controller.end_call("raw").await.unwrap_err();
        assert_eq!(raw.status(), Some(503));
        assert!(raw.to_string().ends_with("Response: upstream unavailable..."));
    }
}
