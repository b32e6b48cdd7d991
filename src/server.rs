//! HTTP surface for the chat handler.

use crate::chat::{ChatHandler, ChatRequest, ChatResponse};
use crate::error::ChatError;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChatError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ChatError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "message": self.reason(),
            }
        }));
        (status, body).into_response()
    }
}

/// Build the router: `POST /chat` and `GET /health`.
pub fn router(handler: Arc<ChatHandler>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

async fn chat(
    State(handler): State<Arc<ChatHandler>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ChatError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected chat body");
        ChatError::InvalidRequest(rejection.body_text())
    })?;
    handler.handle(&request).await.map(Json)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(handler: ChatHandler, addr: &str) -> anyhow::Result<()> {
    use anyhow::Context;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let local = listener.local_addr()?;
    tracing::info!("Listening on {}", local);

    axum::serve(listener, router(Arc::new(handler)))
        .await
        .context("Server error")
}
