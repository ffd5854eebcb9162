//! Moodwell HTTP REST API
//!
//! Axum server running alongside the Unix socket IPC server on port 8780
//! (configurable). Every endpoint is a thin axum handler over an inner
//! function that returns `(StatusCode, Value)`; the inner functions go
//! through the same request router as IPC.
//!
//! Endpoints:
//! - GET  /health
//! - GET  /version
//! - POST /conversations/:conversation_id/messages
//! - GET  /conversations/:conversation_id/turns?limit=
//! - POST /moods/:user_id
//! - GET  /moods/:user_id/summary?days=

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use moodwell_core::ipc::{MoodwellRequest, MoodwellResponse, PROTOCOL_VERSION};
use moodwell_core::MoodCategory;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::router::handle_request;
use crate::subsystems::pipeline::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route(
            "/conversations/:conversation_id/messages",
            post(send_message_handler),
        )
        .route("/conversations/:conversation_id/turns", get(turns_handler))
        .route("/moods/:user_id", post(record_mood_handler))
        .route("/moods/:user_id/summary", get(mood_summary_handler))
        .with_state(state)
}

/// Serve until the shutdown broadcast fires.
pub async fn start_http_server(
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);
    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Moodwell HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct SendMessageRequest {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TurnsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RecordMoodRequest {
    pub category: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SummaryQuery {
    pub days: Option<u32>,
}

// ============================================================================
// Inner functions
// ============================================================================

pub async fn health_inner(state: &AppState) -> (StatusCode, serde_json::Value) {
    match response_to_http(handle_request(MoodwellRequest::Health, state).await) {
        Ok(mut data) => {
            if let Some(obj) = data.as_object_mut() {
                obj.insert("version".to_string(), serde_json::json!(env!("CARGO_PKG_VERSION")));
                obj.insert(
                    "socket".to_string(),
                    serde_json::json!(state.config.service.socket_path),
                );
            }
            (StatusCode::OK, data)
        }
        Err(body) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": body["error"],
            }),
        ),
    }
}

pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": PROTOCOL_VERSION,
    })
}

pub async fn send_message_inner(
    state: &AppState,
    conversation_id: String,
    req: SendMessageRequest,
) -> (StatusCode, serde_json::Value) {
    let text = match req.text {
        Some(t) if !t.trim().is_empty() => t,
        _ => return bad_request("text field is required"),
    };

    let start = Instant::now();
    let response = handle_request(
        MoodwellRequest::SendMessage {
            conversation_id: conversation_id.clone(),
            text,
        },
        state,
    )
    .await;

    let result = respond(response);
    tracing::debug!(
        conversation_id = %conversation_id,
        status = result.0.as_u16(),
        took_ms = start.elapsed().as_millis() as u64,
        "Handled message"
    );
    result
}

pub async fn turns_inner(
    state: &AppState,
    conversation_id: String,
    query: TurnsQuery,
) -> (StatusCode, serde_json::Value) {
    respond(
        handle_request(
            MoodwellRequest::History {
                conversation_id,
                limit: query.limit,
            },
            state,
        )
        .await,
    )
}

pub async fn record_mood_inner(
    state: &AppState,
    user_id: String,
    req: RecordMoodRequest,
) -> (StatusCode, serde_json::Value) {
    let category = match req.category.as_deref().map(MoodCategory::parse) {
        Some(Some(c)) => c,
        Some(None) => {
            return bad_request(format!(
                "category must be one of: {}",
                MoodCategory::ALL
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        }
        None => return bad_request("category field is required"),
    };

    respond(
        handle_request(
            MoodwellRequest::RecordMood {
                user_id,
                category,
                note: req.note,
            },
            state,
        )
        .await,
    )
}

pub async fn mood_summary_inner(
    state: &AppState,
    user_id: String,
    query: SummaryQuery,
) -> (StatusCode, serde_json::Value) {
    respond(
        handle_request(
            MoodwellRequest::MoodSummary {
                user_id,
                days: query.days.unwrap_or(7),
            },
            state,
        )
        .await,
    )
}

// ============================================================================
// Axum handlers
// ============================================================================

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

// Extractor rejections are reported through the same JSON error body as
// every other invalid input.

pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    req: Result<Json<SendMessageRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match req {
        Ok(Json(req)) => send_message_inner(&state, conversation_id, req).await,
        Err(rejection) => bad_request(rejection.body_text()),
    };
    (status, Json(body))
}

pub async fn turns_handler(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    query: Result<Query<TurnsQuery>, QueryRejection>,
) -> impl IntoResponse {
    let (status, body) = match query {
        Ok(Query(query)) => turns_inner(&state, conversation_id, query).await,
        Err(rejection) => bad_request(rejection.body_text()),
    };
    (status, Json(body))
}

pub async fn record_mood_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    req: Result<Json<RecordMoodRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match req {
        Ok(Json(req)) => record_mood_inner(&state, user_id, req).await,
        Err(rejection) => bad_request(rejection.body_text()),
    };
    (status, Json(body))
}

pub async fn mood_summary_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> impl IntoResponse {
    let (status, body) = match query {
        Ok(Query(query)) => mood_summary_inner(&state, user_id, query).await,
        Err(rejection) => bad_request(rejection.body_text()),
    };
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

/// HTTP status for an error kind tag.
pub fn status_for_kind(kind: &str) -> StatusCode {
    match kind {
        "invalid_input" => StatusCode::BAD_REQUEST,
        "transport" | "upstream" | "empty_response" => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Split an IPC response into its data, or a ready-made error body.
pub fn response_to_http(
    response: MoodwellResponse,
) -> std::result::Result<serde_json::Value, serde_json::Value> {
    if response.is_ok() {
        Ok(response.data.unwrap_or(serde_json::json!({})))
    } else {
        Err(serde_json::json!({
            "error": response.error.unwrap_or_else(|| "unknown error".to_string()),
            "kind": response.kind.unwrap_or_else(|| "unknown".to_string()),
            "status": "error",
        }))
    }
}

fn respond(response: MoodwellResponse) -> (StatusCode, serde_json::Value) {
    match response_to_http(response) {
        Ok(data) => (StatusCode::OK, data),
        Err(body) => {
            let status = status_for_kind(body["kind"].as_str().unwrap_or_default());
            (status, body)
        }
    }
}

fn bad_request(msg: impl Into<String>) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::BAD_REQUEST,
        serde_json::json!({
            "error": msg.into(),
            "kind": "invalid_input",
            "status": "error",
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodwell_core::MoodwellConfig;

    async fn state() -> AppState {
        AppState::from_config(MoodwellConfig::default()).await.unwrap()
    }

    #[test]
    fn test_version_inner_pure() {
        let v = version_inner();
        assert!(v["version"].is_string());
        assert_eq!(v["protocol"], "moodwell/1");
    }

    #[test]
    fn test_status_for_kind() {
        assert_eq!(status_for_kind("invalid_input"), StatusCode::BAD_REQUEST);
        assert_eq!(status_for_kind("transport"), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for_kind("upstream"), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for_kind("empty_response"), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for_kind("store"), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_for_kind("unknown_category"),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_to_http_error_carries_kind() {
        let body = response_to_http(MoodwellResponse::err("store", "disk full")).unwrap_err();
        assert_eq!(body["error"], "disk full");
        assert_eq!(body["kind"], "store");
        assert_eq!(body["status"], "error");
    }

    #[test]
    fn test_response_to_http_ok_no_data() {
        let mut resp = MoodwellResponse::ok(serde_json::json!({}));
        resp.data = None;
        assert!(response_to_http(resp).unwrap().is_object());
    }

    #[tokio::test]
    async fn test_send_message_inner_missing_text() {
        let (status, body) =
            send_message_inner(&state().await, "c1".to_string(), SendMessageRequest::default())
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn test_send_message_inner_local_reply() {
        let (status, body) = send_message_inner(
            &state().await,
            "c1".to_string(),
            SendMessageRequest {
                text: Some("I am so tired".to_string()),
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "local");
        assert!(body["assistant_text"]
            .as_str()
            .unwrap()
            .contains("Affirmation:"));
    }

    #[tokio::test]
    async fn test_record_mood_inner_rejects_unknown_category() {
        let (status, body) = record_mood_inner(
            &state().await,
            "u1".to_string(),
            RecordMoodRequest {
                category: Some("grumpy".to_string()),
                note: None,
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("happy"));
    }

    #[tokio::test]
    async fn test_mood_summary_inner_rejects_zero_days() {
        let (status, body) =
            mood_summary_inner(&state().await, "u1".to_string(), SummaryQuery { days: Some(0) })
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn test_health_inner_memory_backend() {
        let (status, body) = health_inner(&state().await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["socket"], "/tmp/moodwell.sock");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
