//! HTTP handlers and router assembly

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;

use chatbridge_core::ChatMessage;
use chatbridge_runtime::{ChatService, SESSION_HEADER, resolve_session_id};

use crate::error::{ApiError, handle_panic};

pub type AppState = Arc<ChatService>;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub timestamp: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearedResponse {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    pub openai_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
struct Banner {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

async fn root() -> Json<Banner> {
    Json(Banner {
        message: "Chatbot API is running!",
    })
}

async fn health() -> Json<Health> {
    Json(Health { status: "healthy" })
}

// POST /chat
async fn chat(
    State(service): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let header = headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok());
    let session_id = resolve_session_id(request.session_id.as_deref(), header);

    let reply = service.chat(&session_id, &request.message).await?;
    Ok(Json(ChatResponse {
        response: reply.response,
        timestamp: reply.timestamp,
        session_id: reply.session_id,
    }))
}

// GET /history/{session_id}
async fn get_history(
    State(service): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    let transcript = service.history(&session_id);
    Json(HistoryResponse {
        session_id,
        messages: transcript.into_messages(),
    })
}

// DELETE /history/{session_id}
async fn clear_history(
    State(service): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<ClearedResponse> {
    service.reset(&session_id);
    Json(ClearedResponse {
        session_id,
        message: "History cleared".to_string(),
    })
}

// GET /openai-status
async fn provider_status(State(service): State<AppState>) -> Json<StatusResponse> {
    let status = service.probe().await;
    Json(StatusResponse {
        status: status.status().to_string(),
        message: status.message(),
        openai_available: status.is_available(),
        model: status.model().map(String::from),
    })
}

/// Allowed origins come from configuration; methods and headers are
/// mirrored from the preflight, which keeps credentials usable.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn build_router(service: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route(
            "/history/{session_id}",
            get(get_history).delete(clear_history),
        )
        .route("/openai-status", get(provider_status))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(service)
}
