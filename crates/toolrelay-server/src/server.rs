//! HTTP API — `POST /api/chat`, `GET /api/health`, `GET /api/tools`.
//!
//! The registry is fully assembled before the listener binds; handlers only
//! read shared state, so no request ever waits on discovery.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn, Level};

use toolrelay_agent::AgentLoop;
use toolrelay_core::config::schema::ServerConfig;
use toolrelay_core::types::ChatMessage;

use crate::helpers;

const MESSAGES_REQUIRED: &str = "Messages array is required";
const CHAT_FAILED: &str = "Failed to process chat request";

// ─────────────────────────────────────────────
// State
// ─────────────────────────────────────────────

pub struct AppState {
    agent: AgentLoop,
}

impl AppState {
    pub fn new(agent: AgentLoop) -> Self {
        Self { agent }
    }
}

/// One entry of `GET /api/tools`.
#[derive(Debug, Serialize)]
struct ToolInfo {
    name: String,
    description: String,
    parameters: Value,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

// ─────────────────────────────────────────────
// Routes
// ─────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/health", get(health))
        .route("/api/tools", get(list_tools))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Bind and serve until Ctrl+C.
pub async fn serve(config: &ServerConfig, state: Arc<AppState>) -> Result<()> {
    let tool_count = state.agent.tools().len();
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    let addr = listener.local_addr().context("listener has no local address")?;

    info!(%addr, tools = tool_count, model = %state.agent.model(), "server listening");
    helpers::print_banner(&addr.to_string(), tool_count);

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        return;
    }
    info!("Ctrl+C received, shutting down");
}

// ─────────────────────────────────────────────
// POST /api/chat
// ─────────────────────────────────────────────

async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let history = match parse_messages(&body) {
        Ok(history) => history,
        Err(resp) => return resp,
    };

    match state.agent.run(&history).await {
        Ok(output) => Json(output).into_response(),
        Err(e) => {
            error!(error = %e, "chat request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, CHAT_FAILED)
        }
    }
}

/// Validate the request body into a non-empty conversation.
fn parse_messages(body: &[u8]) -> Result<Vec<ChatMessage>, Response> {
    let request: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let raw = match request.get("messages").and_then(Value::as_array) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(error_response(StatusCode::BAD_REQUEST, MESSAGES_REQUIRED)),
    };

    raw.iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<ChatMessage>(item.clone()).map_err(|e| {
                warn!(index = i, error = %e, "rejecting malformed message");
                error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid message format: message {i}: {e}"),
                )
            })
        })
        .collect()
}

// ─────────────────────────────────────────────
// GET /api/health, GET /api/tools
// ─────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "tools": state.agent.tools().len(),
    }))
}

async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Vec<ToolInfo>> {
    let registry = state.agent.tools();
    let tools = registry
        .tool_names()
        .into_iter()
        .filter_map(|name| registry.get(&name).cloned())
        .map(|tool| ToolInfo {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
        })
        .collect();
    Json(tools)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
