use crate::state::AppState;
use adviser::models::message::ChatMessage;
use adviser::models::role::Role;
use adviser::protocol;
use axum::{
    extract::State,
    http::{self, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::{stream::StreamExt, Stream};
use serde::Deserialize;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;

#[derive(Debug, Deserialize)]
pub(crate) struct ChatRequest {
    pub(crate) messages: Vec<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IncomingMessage {
    role: String,
    content: String,
}

// Streaming body speaking the data stream protocol
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        http::Response::builder()
            .header("Content-Type", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            .header("x-vercel-ai-data-stream", "v1")
            .body(body)
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build stream response: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })
    }
}

// Convert the incoming transcript, rejecting turns a relay cannot replay
pub(crate) fn convert_messages(incoming: Vec<IncomingMessage>) -> Result<Vec<ChatMessage>, String> {
    if incoming.is_empty() {
        return Err("no messages".to_string());
    }

    incoming
        .into_iter()
        .map(|msg| {
            let role = match msg.role.as_str() {
                "user" => Role::User,
                "assistant" => Role::Assistant,
                other => return Err(format!("unknown role: {}", other)),
            };
            let message = ChatMessage::new(role, msg.content);
            message.validate().map_err(|e| e.to_string())?;
            Ok(message)
        })
        .collect()
}

async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<SseResponse, StatusCode> {
    // Check protocol header (optional in our case)
    if let Some(protocol) = headers.get("x-protocol") {
        if protocol.to_str().map(|p| p != "data").unwrap_or(true) {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let messages = convert_messages(request.messages).map_err(|e| {
        tracing::warn!("Rejected transcript: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    let mut output = state.relay.open_stream(messages);

    tokio::spawn(async move {
        loop {
            match timeout(Duration::from_millis(500), output.next()).await {
                Ok(Some(Ok(text))) => {
                    if let Err(e) = tx.send(protocol::format_text(&text)).await {
                        tracing::error!("Error sending message through channel: {}", e);
                        return;
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::error!("Error relaying message: {}", e);
                    let _ = tx.send(protocol::format_error(&e.to_string())).await;
                    let _ = tx.send(protocol::format_finish("error")).await;
                    return;
                }
                Ok(None) => break,
                Err(_) => {
                    // Heartbeat, used to detect disconnected clients and stop the run polling
                    if tx.is_closed() {
                        tracing::info!("client disconnected before the reply finished");
                        return;
                    }
                }
            }
        }

        let _ = tx.send(protocol::format_finish("stop")).await;
    });

    Ok(SseResponse::new(stream))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/reply", post(handler))
        .with_state(state)
}
