use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;

use remessa_core::{Message, Payload, QueueCommand, Relay, ServerConfig};

use crate::error::IntoApiResponse;

#[derive(Clone)]
pub(crate) struct AppState {
    relay: Arc<Relay>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IngressRequest {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    error: String,
}

impl ErrorBody {
    pub(crate) fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

pub(crate) fn router(relay: Arc<Relay>, config: &ServerConfig) -> Router {
    let state = AppState { relay };
    Router::new()
        .route("/", get(health))
        .route(&config.ingress_path, post(ingress))
        .route("/stats", get(stats))
        .route("/failed", get(list_failed))
        .with_state(state)
}

async fn health() -> &'static str {
    "running"
}

/// Accept one inbound message: validate, enqueue, return. Delivery happens
/// in the background; this handler never waits on the sink.
async fn ingress(State(state): State<AppState>, Json(req): Json<IngressRequest>) -> Response {
    let Some(message) = req.message else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("missing required field: message")),
        )
            .into_response();
    };
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("message must not be empty")),
        )
            .into_response();
    }

    // Validation passed; the flag travels with the payload downstream.
    let payload = Payload {
        message,
        is_valid: true,
    };
    let message = Message::new(payload, now_ns());
    let msg_id = message.id;

    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    if let Err(e) = state.relay.send_command(QueueCommand::Enqueue {
        message,
        reply: reply_tx,
    }) {
        return e.into_api_response();
    }

    match reply_rx.await {
        Ok(Ok(_)) => {
            debug!(%msg_id, "message accepted");
            StatusCode::ACCEPTED.into_response()
        }
        Ok(Err(e)) => e.into_api_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody::new("queue unavailable")),
        )
            .into_response(),
    }
}

async fn stats(State(state): State<AppState>) -> Response {
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    if let Err(e) = state
        .relay
        .send_command(QueueCommand::Stats { reply: reply_tx })
    {
        return e.into_api_response();
    }
    match reply_rx.await {
        Ok(stats) => Json(stats).into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody::new("queue unavailable")),
        )
            .into_response(),
    }
}

async fn list_failed(State(state): State<AppState>) -> Response {
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    if let Err(e) = state
        .relay
        .send_command(QueueCommand::ListFailed { reply: reply_tx })
    {
        return e.into_api_response();
    }
    match reply_rx.await {
        Ok(failed) => Json(failed).into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody::new("queue unavailable")),
        )
            .into_response(),
    }
}

fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
