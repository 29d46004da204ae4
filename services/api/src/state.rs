//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the provider
//! clients every handler needs. It is built once at startup from the
//! [`Config`] and is read-only afterwards.

use crate::config::Config;
use receptionist_core::{
    call::{BlandCallController, CallController},
    dispatcher::WebhookDispatcher,
    language::{GeminiResponder, LanguageResponder},
    speech::{BlandSpeechRelay, SpeechRelay},
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub call_controller: Arc<dyn CallController>,
    pub responder: Arc<dyn LanguageResponder>,
    pub dispatcher: Arc<WebhookDispatcher>,
}

impl AppState {
    /// Wires the components together from explicit parts.
    pub fn new(
        call_controller: Arc<dyn CallController>,
        responder: Arc<dyn LanguageResponder>,
        relay: Arc<dyn SpeechRelay>,
    ) -> Self {
        let dispatcher = Arc::new(WebhookDispatcher::new(responder.clone(), relay));
        Self {
            call_controller,
            responder,
            dispatcher,
        }
    }

    /// Builds the production clients. Every outbound request shares one HTTP
    /// client bounded by `config.http_timeout`.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self::new(
            Arc::new(BlandCallController::new(
                client.clone(),
                config.voice.clone(),
            )),
            Arc::new(GeminiResponder::new(client.clone(), config.language.clone())),
            Arc::new(BlandSpeechRelay::new(client, config.voice.clone())),
        ))
    }
}
