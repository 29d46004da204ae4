//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, the provider webhook, the two HTML pages, and the
//! OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ChatPayload, ChatResponse, EndCallPayload, EndCallResponse, ErrorResponse,
        StartCallPayload, WebhookAck,
    },
    pages,
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::start_call,
        handlers::end_call,
        handlers::bland_ai_webhook,
        handlers::chat,
    ),
    components(
        schemas(StartCallPayload, EndCallPayload, EndCallResponse, ChatPayload, ChatResponse, WebhookAck, ErrorResponse)
    ),
    tags(
        (name = "Receptionist API", description = "Phone calls and chat with the AI receptionist")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/start_call", post(handlers::start_call))
        .route("/end_call", post(handlers::end_call))
        .route("/bland_ai_webhook", post(handlers::bland_ai_webhook))
        .route("/chat", post(handlers::chat))
        .with_state(app_state);

    Router::new()
        .route("/", get(pages::home))
        .route("/index.html", get(pages::chat_page))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
