use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// One role-tagged, timestamped message in a persisted dialogue.
///
/// Turns are append-only: once handed to a `ConversationStore` they are
/// never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub conversation_id: String,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(conversation_id: &str, role: Role, text: impl Into<String>) -> Self {
        Self::at(conversation_id, role, text, Utc::now())
    }

    pub fn at(
        conversation_id: &str,
        role: Role,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id: conversation_id.to_string(),
            role,
            text: text.into(),
            created_at,
        }
    }
}
