pub mod auth;
pub mod config;
pub mod db;
pub mod empathy;
pub mod error;
pub mod history;
pub mod ipc;
pub mod models;
pub mod orchestrator;
pub mod remote;
pub mod sentiment;
pub mod store;

pub use auth::{AuthState, AuthStateHub};
pub use config::MoodwellConfig;
pub use empathy::{EmpathyGenerator, EmpathyResponse, EmpathyTemplate, SelectionPolicy};
pub use error::{MoodwellError, PipelineError, StoreError, TurnStep};
pub use history::{HistoryError, MemoryMoodLog, MoodLog, MoodSummary, PgMoodLog};
pub use models::{ConversationTurn, MoodCategory, MoodClassification, MoodEntry, Role};
pub use orchestrator::{
    OrchestratorSettings, PersistenceMode, ReplySource, ResponseStrategy, TurnOrchestrator,
    TurnReply,
};
pub use remote::{
    create_model_client, GeminiConfig, GeminiModelClient, ModelClient, RemoteError,
    RetryingModelClient,
};
pub use sentiment::SentimentClassifier;
pub use store::{ConversationStore, MemoryConversationStore, PgConversationStore};
