use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use conduit_core::{ChatRequest, SearchQuery, SearchRequest};
use conduit_relay::{RelayService, UpstreamRequest};

use crate::sse::frame_response;

pub fn build_router(relay: RelayService) -> Router {
    Router::new()
        .route("/search/stream", get(search_stream))
        .route("/chat/stream", post(chat_stream))
        .route("/health", get(health))
        .with_state(relay)
}

async fn search_stream(
    State(relay): State<RelayService>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let request = UpstreamRequest::Search(SearchRequest::from(query));
    frame_response(relay.relay(request))
}

async fn chat_stream(
    State(relay): State<RelayService>,
    Json(request): Json<ChatRequest>,
) -> Response {
    frame_response(relay.relay(UpstreamRequest::Chat(request)))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy", "service": "relay"}))
}
