//! Call orchestration for the AI receptionist.
//!
//! This crate holds every piece of decision logic behind the receptionist
//! service: the clients for the voice and language providers, the typed
//! webhook events, and the dispatcher that turns caller transcriptions into
//! spoken replies. It has no HTTP server code of its own; the `api` service
//! wires these components into routes.

pub mod call;
pub mod dispatcher;
pub mod event;
pub mod language;
pub mod speech;
pub mod voice;

/// Returns at most `max` characters of `text`, for log lines and error messages.
pub(crate) fn preview(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
