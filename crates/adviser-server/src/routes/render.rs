use super::reply::{convert_messages, ChatRequest};
use adviser::surface::{ChatSurface, RenderedEntry};
use axum::{http::StatusCode, routing::post, Json, Router};

// Transcript entries as HTML, citations stripped and markdown rendered
async fn handler(Json(request): Json<ChatRequest>) -> Result<Json<Vec<RenderedEntry>>, StatusCode> {
    let messages = convert_messages(request.messages).map_err(|e| {
        tracing::warn!("Rejected transcript for rendering: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    Ok(Json(ChatSurface::with_messages(messages).render()))
}

pub fn routes() -> Router {
    Router::new().route("/render", post(handler))
}
