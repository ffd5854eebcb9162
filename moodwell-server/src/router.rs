use chrono::Utc;
use moodwell_core::history;
use moodwell_core::ipc::{MoodwellRequest, MoodwellResponse};

use crate::subsystems::pipeline::AppState;

/// Single dispatch point for the IPC socket and the HTTP API.
pub async fn handle_request(request: MoodwellRequest, state: &AppState) -> MoodwellResponse {
    match request {
        MoodwellRequest::Ping => MoodwellResponse::pong(),
        MoodwellRequest::Health => health(state).await,
        MoodwellRequest::SendMessage {
            conversation_id,
            text,
        } => match state
            .orchestrator
            .handle_user_message(&conversation_id, &text)
            .await
        {
            Ok(reply) => match serde_json::to_value(&reply) {
                Ok(data) => MoodwellResponse::ok(data),
                Err(e) => MoodwellResponse::err("internal", e.to_string()),
            },
            Err(e) => MoodwellResponse::err(e.kind(), e.to_string()),
        },
        MoodwellRequest::History {
            conversation_id,
            limit,
        } => match state
            .orchestrator
            .store()
            .history(&conversation_id, limit)
            .await
        {
            Ok(turns) => MoodwellResponse::ok(serde_json::json!({
                "conversation_id": conversation_id,
                "count": turns.len(),
                "turns": turns,
            })),
            Err(e) => MoodwellResponse::err("store", e.to_string()),
        },
        MoodwellRequest::RecordMood {
            user_id,
            category,
            note,
        } => match history::record_mood(state.moods.as_ref(), &user_id, category, note).await {
            Ok(entry) => match serde_json::to_value(&entry) {
                Ok(data) => MoodwellResponse::ok(data),
                Err(e) => MoodwellResponse::err("internal", e.to_string()),
            },
            Err(e) => MoodwellResponse::err(e.kind(), e.to_string()),
        },
        MoodwellRequest::MoodSummary { user_id, days } => {
            match history::mood_summary(state.moods.as_ref(), &user_id, Utc::now(), days).await {
                Ok(summary) => match serde_json::to_value(&summary) {
                    Ok(data) => MoodwellResponse::ok(data),
                    Err(e) => MoodwellResponse::err("internal", e.to_string()),
                },
                Err(e) => MoodwellResponse::err(e.kind(), e.to_string()),
            }
        }
    }
}

async fn health(state: &AppState) -> MoodwellResponse {
    let store = state.orchestrator.store().name().to_string();
    let database = match &state.pool {
        Some(pool) => match moodwell_core::db::health_check(pool).await {
            Ok(v) => serde_json::json!(v),
            Err(e) => return MoodwellResponse::err("store", format!("DB Health Check failed: {}", e)),
        },
        None => serde_json::Value::Null,
    };
    let settings = state.orchestrator.settings();
    MoodwellResponse::ok(serde_json::json!({
        "status": "healthy",
        "store": store,
        "postgresql": database,
        "strategy": settings.strategy,
        "persistence": settings.persistence,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodwell_core::{MoodCategory, MoodwellConfig};

    async fn state() -> AppState {
        AppState::from_config(MoodwellConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let resp = handle_request(MoodwellRequest::Ping, &state().await).await;
        assert!(resp.is_ok());
        assert_eq!(resp.data.unwrap()["pong"], true);
    }

    #[tokio::test]
    async fn test_health_reports_memory_store() {
        let resp = handle_request(MoodwellRequest::Health, &state().await).await;
        let data = resp.data.unwrap();
        assert_eq!(data["status"], "healthy");
        assert_eq!(data["store"], "memory");
        assert_eq!(data["strategy"], "local");
        assert!(data["postgresql"].is_null());
    }

    #[tokio::test]
    async fn test_send_message_then_history() {
        let state = state().await;
        let resp = handle_request(
            MoodwellRequest::SendMessage {
                conversation_id: "alice".to_string(),
                text: "I feel great today".to_string(),
            },
            &state,
        )
        .await;
        assert!(resp.is_ok(), "{:?}", resp.error);
        let data = resp.data.unwrap();
        assert_eq!(data["source"], "local");
        assert!(data["assistant_text"].as_str().unwrap().contains("Try this:"));
        assert!(data.get("warning").is_none());

        let resp = handle_request(
            MoodwellRequest::History {
                conversation_id: "alice".to_string(),
                limit: None,
            },
            &state,
        )
        .await;
        let data = resp.data.unwrap();
        assert_eq!(data["count"], 2);
        assert_eq!(data["turns"][0]["role"], "user");
        assert_eq!(data["turns"][1]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_send_message_invalid_input_kind() {
        let resp = handle_request(
            MoodwellRequest::SendMessage {
                conversation_id: "alice".to_string(),
                text: "   ".to_string(),
            },
            &state().await,
        )
        .await;
        assert!(!resp.is_ok());
        assert_eq!(resp.kind.as_deref(), Some("invalid_input"));
    }

    #[tokio::test]
    async fn test_record_mood_and_summary() {
        let state = state().await;
        for category in [MoodCategory::Calm, MoodCategory::Calm, MoodCategory::Sad] {
            let resp = handle_request(
                MoodwellRequest::RecordMood {
                    user_id: "bob".to_string(),
                    category,
                    note: None,
                },
                &state,
            )
            .await;
            assert!(resp.is_ok());
        }

        let resp = handle_request(
            MoodwellRequest::MoodSummary {
                user_id: "bob".to_string(),
                days: 7,
            },
            &state,
        )
        .await;
        let data = resp.data.unwrap();
        assert_eq!(data["total"], 3);
        assert_eq!(data["dominant"], "calm");
        assert_eq!(data["counts"]["sad"], 1);
        assert_eq!(data["daily"].as_array().unwrap().len(), 7);
    }
}
