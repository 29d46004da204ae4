//! Webhook Event Dispatcher
//!
//! Receives one call-lifecycle event at a time, classifies it, and routes it
//! to its handler. Transcriptions are the only events that trigger outbound
//! work: the caller's words go to the [`LanguageResponder`] and the reply is
//! spoken back through the [`SpeechRelay`].
//!
//! The dispatcher keeps no state between events. It reports malformed
//! payloads as [`DispatchError`]; deciding how to acknowledge them is left to
//! the HTTP layer, which always answers the provider with success.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::event::{
    CallEnded, CallInitiated, EventError, ProviderFault, Speak, Transcription, WebhookEvent,
};
use crate::language::LanguageResponder;
use crate::preview;
use crate::speech::SpeechRelay;

/// How a well-formed event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event matched a handler and was processed.
    Handled,
    /// The event was unrecognised or missing the fields its handler needs.
    Ignored,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Routes voice-provider webhooks to their handlers.
pub struct WebhookDispatcher {
    responder: Arc<dyn LanguageResponder>,
    relay: Arc<dyn SpeechRelay>,
}

impl WebhookDispatcher {
    pub fn new(responder: Arc<dyn LanguageResponder>, relay: Arc<dyn SpeechRelay>) -> Self {
        Self { responder, relay }
    }

    /// Decodes a raw webhook body and handles the event it carries.
    pub async fn dispatch(&self, body: &[u8]) -> Result<DispatchOutcome, DispatchError> {
        debug!(payload = %String::from_utf8_lossy(body), "Webhook received");
        let event = WebhookEvent::from_slice(body)?;
        Ok(self.handle(event).await)
    }

    /// Handles an already-decoded event.
    pub async fn handle(&self, event: WebhookEvent) -> DispatchOutcome {
        match event {
            WebhookEvent::Transcription(transcription) => {
                self.on_transcription(transcription).await
            }
            WebhookEvent::CallEnded(ended) => on_call_ended(ended),
            WebhookEvent::CallInitiated(CallInitiated { call_id, to, from }) => {
                info!(call_id = ?call_id, to = ?to, from = ?from, "Call initiated");
                DispatchOutcome::Handled
            }
            WebhookEvent::SpeakStarted(Speak { call_id, text }) => {
                info!(call_id = ?call_id, text = %preview(text.as_deref().unwrap_or_default(), 50), "Speak started");
                DispatchOutcome::Handled
            }
            WebhookEvent::SpeakEnded(Speak { call_id, text }) => {
                info!(call_id = ?call_id, text = %preview(text.as_deref().unwrap_or_default(), 50), "Speak ended");
                DispatchOutcome::Handled
            }
            WebhookEvent::Error(ProviderFault {
                call_id,
                code,
                message,
            }) => {
                warn!(call_id = ?call_id, code = ?code, message = ?message, "Voice provider reported an error");
                DispatchOutcome::Handled
            }
            WebhookEvent::Unknown(tag) => {
                info!(event = ?tag, "Ignoring unhandled webhook event");
                DispatchOutcome::Ignored
            }
        }
    }

    async fn on_transcription(&self, transcription: Transcription) -> DispatchOutcome {
        let call_id = transcription.call_id.filter(|id| !id.is_empty());
        let text = transcription
            .transcription
            .filter(|text| !text.trim().is_empty());
        let (Some(call_id), Some(text)) = (call_id, text) else {
            warn!("Missing call_id or transcription in webhook");
            return DispatchOutcome::Ignored;
        };

        info!(call_id = %call_id, transcription = %text, "Received transcription");

        match self.responder.respond(&text).await {
            Ok(reply) if !reply.trim().is_empty() => {
                self.relay.speak(&call_id, reply.trim()).await;
            }
            Ok(_) => {
                warn!(call_id = %call_id, "Empty reply from language provider. Nothing to relay.");
            }
            Err(e) => {
                error!(call_id = %call_id, error = %e, "No reply from language provider. Nothing to relay.");
            }
        }
        DispatchOutcome::Handled
    }
}

fn on_call_ended(ended: CallEnded) -> DispatchOutcome {
    info!(
        call_id = ?ended.call_id,
        direction = ?ended.direction,
        duration_secs = ?ended.duration,
        cost = ?ended.cost,
        "Call ended"
    );
    if let Some(error) = &ended.error {
        warn!(call_id = ?ended.call_id, error = %error, "Call ended with an error");
    }
    if let Some(summary) = &ended.summary {
        info!(call_id = ?ended.call_id, summary = %summary, "Call summary");
    }
    DispatchOutcome::Handled
}
