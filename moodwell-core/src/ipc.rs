use serde::{Deserialize, Serialize};

use crate::models::MoodCategory;

pub const PROTOCOL_VERSION: &str = "moodwell/1";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MoodwellRequest {
    Ping,
    Health,
    SendMessage {
        conversation_id: String,
        text: String,
    },
    History {
        conversation_id: String,
        limit: Option<usize>,
    },
    RecordMood {
        user_id: String,
        category: MoodCategory,
        note: Option<String>,
    },
    MoodSummary {
        user_id: String,
        #[serde(default = "default_summary_days")]
        days: u32,
    },
}

fn default_summary_days() -> u32 {
    7
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MoodwellResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    /// Error kind tag (`invalid_input`, `store`, `transport`, ...).
    pub kind: Option<String>,
    pub version: String,
}

impl MoodwellResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            kind: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(kind: &str, msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            kind: Some(kind.to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
