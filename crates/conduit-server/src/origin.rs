use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use tracing::info;

use conduit_core::{encode, ChatRequest, Frame, RequestId, SearchRequest};
use conduit_origin::{EventSource, EventStream, ProgressSource, TokenSource};

use crate::sse::frame_response;

/// Event sources behind the origin routes.
#[derive(Clone)]
pub struct OriginState {
    pub progress: ProgressSource,
    pub tokens: TokenSource,
}

pub fn build_router(state: OriginState) -> Router {
    Router::new()
        .route("/query/stream", post(query_stream))
        .route("/property_chat/stream", post(property_chat_stream))
        .route("/health", get(health))
        .with_state(state)
}

async fn query_stream(
    State(state): State<OriginState>,
    Json(request): Json<SearchRequest>,
) -> Response {
    let id = RequestId::new();
    info!(request_id = %id, question = %request.question, "search request");
    let events = state.progress.open(&request);
    frame_response(framed(events, id, "search"))
}

async fn property_chat_stream(
    State(state): State<OriginState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let id = RequestId::new();
    info!(request_id = %id, question = %request.user_question, "chat request");
    let events = state.tokens.open(&request);
    frame_response(framed(events, id, "chat"))
}

fn framed(
    events: EventStream,
    id: RequestId,
    kind: &'static str,
) -> impl Stream<Item = Frame> + Send + 'static {
    events.map(move |event| {
        if event.is_terminal() {
            info!(request_id = %id, kind, event = event.kind(), "stream finished");
        }
        encode(&event)
    })
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy", "service": "origin"}))
}
