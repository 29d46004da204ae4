//! Speech Relay
//!
//! Pushes text-to-speech content into a call that is already in progress.
//! Delivery is best-effort: by the time a reply is ready the webhook that
//! triggered it has been handled, so failures here are only logged.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::preview;
use crate::voice::VoiceProviderSettings;

/// Speaks text into an active call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechRelay: Send + Sync {
    async fn speak(&self, call_id: &str, text: &str);
}

#[derive(Serialize)]
struct SpeakBody<'a> {
    text: &'a str,
    reduce_latency: bool,
}

/// A [`SpeechRelay`] that uses the Bland AI `speak` endpoint.
pub struct BlandSpeechRelay {
    client: Client,
    settings: VoiceProviderSettings,
}

impl BlandSpeechRelay {
    pub fn new(client: Client, settings: VoiceProviderSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl SpeechRelay for BlandSpeechRelay {
    async fn speak(&self, call_id: &str, text: &str) {
        if self.settings.api_key.is_none() {
            warn!(call_id, "Voice provider API key is not set. Cannot send text to the call.");
            return;
        }
        let url = match self.settings.call_endpoint(call_id, Some("speak")) {
            Ok(url) => url,
            Err(e) => {
                error!(call_id, error = %e, "Cannot build speak endpoint");
                return;
            }
        };

        let result = self
            .settings
            .authorize(self.client.post(url))
            .json(&SpeakBody {
                text,
                reduce_latency: true,
            })
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(call_id, text = %preview(text, 50), "Sent text to call");
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                error!(call_id, status, response = %body, "Voice provider rejected speak request");
            }
            Err(e) => {
                error!(call_id, error = %e, "Speak request failed");
            }
        }
    }
}
