//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests: starting and
//! ending calls, the direct chat endpoint, and the voice provider's webhook.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    body::{Body, to_bytes},
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use futures::FutureExt;
use receptionist_core::{call::CallError, language::chat_prompt};
use serde_json::Value;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tracing::{debug, error, info};

use crate::{
    models::{
        ChatPayload, ChatResponse, DEFAULT_CHAT_LANGUAGE, EndCallPayload, EndCallResponse,
        ErrorResponse, StartCallPayload, WebhookAck,
    },
    state::AppState,
};

/// Largest webhook body read into memory. Anything bigger is acknowledged
/// with an error body instead of being rejected at the transport level.
pub const MAX_WEBHOOK_BODY_BYTES: usize = 16 * 1024 * 1024;

pub enum ApiError {
    BadRequest(String),
    /// A failure reported by an upstream provider, passed through with its status.
    Upstream {
        status: StatusCode,
        message: String,
    },
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(error) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
            }
            ApiError::Upstream { status, message } => {
                error!(%status, "Upstream error: {}", message);
                (status, Json(ErrorResponse { error: message })).into_response()
            }
            ApiError::InternalServerError(error) => {
                error!("Internal Server Error: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { error }),
                )
                    .into_response()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<CallError> for ApiError {
    /// Keeps the provider's status when it is an error status, otherwise 500.
    fn from(err: CallError) -> Self {
        match err
            .status()
            .filter(|status| *status >= 400)
            .and_then(|status| StatusCode::from_u16(status).ok())
        {
            Some(status) => ApiError::Upstream {
                status,
                message: err.to_string(),
            },
            None => ApiError::InternalServerError(err.to_string()),
        }
    }
}

/// Place an outbound call to the given phone number.
#[utoipa::path(
    post,
    path = "/start_call",
    request_body = StartCallPayload,
    responses(
        (status = 200, description = "The voice provider's call payload, including `call_id`"),
        (status = 400, description = "Missing phone number or malformed body", body = ErrorResponse),
        (status = 500, description = "Configuration, provider, or transport error", body = ErrorResponse)
    )
)]
pub async fn start_call(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StartCallPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload?;
    let request = payload
        .into_call_request()
        .ok_or_else(|| ApiError::BadRequest("Phone number is required".to_string()))?;

    let call = state
        .call_controller
        .start_call(&request)
        .await
        .map_err(|e| ApiError::InternalServerError(e.to_string()))?;

    Ok(Json(call.payload))
}

/// End an ongoing call.
#[utoipa::path(
    post,
    path = "/end_call",
    request_body = EndCallPayload,
    responses(
        (status = 200, description = "End signal sent", body = EndCallResponse),
        (status = 400, description = "Missing call id or malformed body", body = ErrorResponse),
        (status = 500, description = "Configuration or transport error, or the provider's own error status", body = ErrorResponse)
    )
)]
pub async fn end_call(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EndCallPayload>, JsonRejection>,
) -> Result<Json<EndCallResponse>, ApiError> {
    let Json(payload) = payload?;
    let call_id = payload
        .call_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Call ID is required".to_string()))?;

    let ack = state.call_controller.end_call(&call_id).await?;

    Ok(Json(EndCallResponse {
        status: "success".to_string(),
        message: ack.message,
    }))
}

/// Receive a call lifecycle event from the voice provider.
///
/// Always answers 200: the provider retries any other status, so failures
/// are reported in the body and the logs only.
#[utoipa::path(
    post,
    path = "/bland_ai_webhook",
    request_body(content = Value, description = "Voice provider event payload"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck)
    )
)]
pub async fn bland_ai_webhook(State(state): State<Arc<AppState>>, body: Body) -> Json<WebhookAck> {
    let body = match to_bytes(body, MAX_WEBHOOK_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Failed to read webhook body");
            return Json(WebhookAck::error());
        }
    };

    let dispatched = AssertUnwindSafe(state.dispatcher.dispatch(&body))
        .catch_unwind()
        .await;

    match dispatched {
        Ok(Ok(outcome)) => {
            debug!(?outcome, "Webhook processed");
            Json(WebhookAck::success())
        }
        Ok(Err(e)) => {
            error!(error = %e, "Failed to process webhook");
            Json(WebhookAck::error())
        }
        Err(_) => {
            error!("Webhook processing panicked");
            Json(WebhookAck::error())
        }
    }
}

/// Chat with the receptionist directly, without a phone call.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatPayload,
    responses(
        (status = 200, description = "The receptionist's reply", body = ChatResponse),
        (status = 400, description = "Empty message or malformed body", body = ErrorResponse),
        (status = 500, description = "No reply from the language provider", body = ErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload?;
    let message = payload.message.as_deref().map(str::trim).unwrap_or_default();
    if message.is_empty() {
        return Err(ApiError::BadRequest("No message provided".to_string()));
    }
    let language = payload
        .language
        .filter(|language| !language.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CHAT_LANGUAGE.to_string());

    info!(language = %language, "Sending chat prompt to language provider");
    let reply = state
        .responder
        .respond(&chat_prompt(message, &language))
        .await
        .ok()
        .filter(|reply| !reply.trim().is_empty())
        .ok_or_else(|| ApiError::InternalServerError("Failed to get response from AI".to_string()))?;

    Ok(Json(ChatResponse {
        response: reply,
        language,
    }))
}
