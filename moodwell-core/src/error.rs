use thiserror::Error;

use crate::models::MoodCategory;
use crate::remote::RemoteError;

#[derive(Error, Debug)]
pub enum MoodwellError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Remote model error: {0}")]
    Remote(#[from] RemoteError),
}

/// Failures raised by a conversation store or mood log backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Which persisted turn a store failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStep {
    UserTurn,
    AssistantTurn,
}

impl std::fmt::Display for TurnStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnStep::UserTurn => f.write_str("user"),
            TurnStep::AssistantTurn => f.write_str("assistant"),
        }
    }
}

/// Errors surfaced by the turn pipeline to its caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to persist {step} turn: {source}")]
    Store {
        step: TurnStep,
        #[source]
        source: StoreError,
    },

    #[error("Remote model error: {0}")]
    Remote(#[from] RemoteError),

    #[error("No empathy template for mood category '{0}'")]
    UnknownCategory(MoodCategory),

    #[error("Pipeline misconfigured: {0}")]
    Config(String),
}

impl PipelineError {
    /// Stable snake_case tag for wire error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::Store { .. } => "store",
            PipelineError::Remote(e) => e.kind(),
            PipelineError::UnknownCategory(_) => "unknown_category",
            PipelineError::Config(_) => "config",
        }
    }
}
