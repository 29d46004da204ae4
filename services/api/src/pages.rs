//! The two static pages served alongside the API.

use axum::response::Html;

/// Landing page with the call form.
pub async fn home() -> Html<&'static str> {
    Html(include_str!("../templates/home.html"))
}

/// Browser chat page backed by `/chat`.
pub async fn chat_page() -> Html<&'static str> {
    Html(include_str!("../templates/index.html"))
}
