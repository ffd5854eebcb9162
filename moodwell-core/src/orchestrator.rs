//! Turn orchestrator
//!
//! Turns one user utterance into persisted conversation turns:
//!
//!   Idle → UserTurnPersisting → ResponseComputing → AssistantTurnPersisting → Done
//!
//! with `Error` reachable from every step before `Done`. Invalid input fails
//! before any store call, and a failed user-turn write aborts before any reply
//! is computed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::empathy::EmpathyGenerator;
use crate::error::{PipelineError, TurnStep};
use crate::models::{ConversationTurn, Role};
use crate::remote::ModelClient;
use crate::sentiment::SentimentClassifier;
use crate::store::ConversationStore;

/// Where the assistant reply comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStrategy {
    /// Classifier + empathy generator, no network.
    #[default]
    Local,
    /// Remote model only; its errors reach the caller.
    Remote,
    /// Remote model first, local reply if the remote call fails for any reason.
    Hybrid,
}

/// What happens when the assistant turn cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceMode {
    /// The call fails with a store error.
    #[default]
    Strict,
    /// The reply is still returned, with a warning attached.
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Local,
    Remote,
    LocalFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    UserTurnPersisting,
    ResponseComputing,
    AssistantTurnPersisting,
    Done,
    Error,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::Idle => "idle",
            TurnPhase::UserTurnPersisting => "user_turn_persisting",
            TurnPhase::ResponseComputing => "response_computing",
            TurnPhase::AssistantTurnPersisting => "assistant_turn_persisting",
            TurnPhase::Done => "done",
            TurnPhase::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReply {
    pub assistant_text: String,
    pub source: ReplySource,
    /// Set when the assistant turn could not be stored in best-effort mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorSettings {
    pub strategy: ResponseStrategy,
    pub persistence: PersistenceMode,
}

pub struct TurnOrchestrator {
    store: Arc<dyn ConversationStore>,
    classifier: SentimentClassifier,
    generator: EmpathyGenerator,
    model: Option<Arc<dyn ModelClient>>,
    settings: OrchestratorSettings,
}

impl TurnOrchestrator {
    /// Fails if a remote-backed strategy is configured without a model client.
    pub fn new(
        store: Arc<dyn ConversationStore>,
        classifier: SentimentClassifier,
        generator: EmpathyGenerator,
        model: Option<Arc<dyn ModelClient>>,
        settings: OrchestratorSettings,
    ) -> Result<Self, PipelineError> {
        if settings.strategy != ResponseStrategy::Local && model.is_none() {
            return Err(PipelineError::Config(format!(
                "strategy {:?} needs a remote model client",
                settings.strategy
            )));
        }
        generator.check_coverage()?;

        Ok(Self {
            store,
            classifier,
            generator,
            model,
            settings,
        })
    }

    pub fn settings(&self) -> OrchestratorSettings {
        self.settings
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub async fn handle_user_message(
        &self,
        conversation_id: &str,
        raw_text: &str,
    ) -> Result<TurnReply, PipelineError> {
        let mut phase = TurnPhase::Idle;
        let result = self.run(conversation_id, raw_text, &mut phase).await;
        if let Err(e) = &result {
            tracing::warn!(
                conversation_id = %conversation_id,
                failed_in = phase.as_str(),
                kind = e.kind(),
                error = %e,
                "Turn failed"
            );
            advance(&mut phase, TurnPhase::Error, conversation_id);
        }
        result
    }

    async fn run(
        &self,
        conversation_id: &str,
        raw_text: &str,
        phase: &mut TurnPhase,
    ) -> Result<TurnReply, PipelineError> {
        if conversation_id.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "conversation id must not be empty".to_string(),
            ));
        }
        let text = raw_text.trim();
        if text.is_empty() {
            return Err(PipelineError::InvalidInput(
                "text must not be empty".to_string(),
            ));
        }

        advance(phase, TurnPhase::UserTurnPersisting, conversation_id);
        let user_turn = ConversationTurn::new(conversation_id, Role::User, text);
        self.store
            .append(&user_turn)
            .await
            .map_err(|source| PipelineError::Store {
                step: TurnStep::UserTurn,
                source,
            })?;

        advance(phase, TurnPhase::ResponseComputing, conversation_id);
        let (assistant_text, source) = self.compute_reply(conversation_id, text).await?;

        advance(phase, TurnPhase::AssistantTurnPersisting, conversation_id);
        let created_at = chrono::Utc::now().max(user_turn.created_at);
        let assistant_turn =
            ConversationTurn::at(conversation_id, Role::Assistant, assistant_text.as_str(), created_at);

        let warning = match self.store.append(&assistant_turn).await {
            Ok(()) => None,
            Err(source) => match self.settings.persistence {
                PersistenceMode::Strict => {
                    return Err(PipelineError::Store {
                        step: TurnStep::AssistantTurn,
                        source,
                    });
                }
                PersistenceMode::BestEffort => {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        error = %source,
                        "Assistant turn not persisted (best-effort mode)"
                    );
                    Some(format!("assistant turn not persisted: {}", source))
                }
            },
        };

        advance(phase, TurnPhase::Done, conversation_id);
        tracing::info!(
            conversation_id = %conversation_id,
            source = ?source,
            persisted = warning.is_none(),
            "Turn complete"
        );

        Ok(TurnReply {
            assistant_text,
            source,
            warning,
        })
    }

    async fn compute_reply(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<(String, ReplySource), PipelineError> {
        match self.settings.strategy {
            ResponseStrategy::Local => Ok((self.local_reply(text)?, ReplySource::Local)),
            // The model sees the same trimmed text that was stored as the user turn
            ResponseStrategy::Remote => {
                let reply = self.remote_model()?.complete(text).await?;
                Ok((reply, ReplySource::Remote))
            }
            ResponseStrategy::Hybrid => {
                let model = self.remote_model()?;
                match model.complete(text).await {
                    Ok(reply) => Ok((reply, ReplySource::Remote)),
                    Err(e) => {
                        tracing::warn!(
                            conversation_id = %conversation_id,
                            client = model.name(),
                            kind = e.kind(),
                            error = %e,
                            "Remote model failed, using local reply"
                        );
                        Ok((self.local_reply(text)?, ReplySource::LocalFallback))
                    }
                }
            }
        }
    }

    fn remote_model(&self) -> Result<&Arc<dyn ModelClient>, PipelineError> {
        self.model
            .as_ref()
            .ok_or_else(|| PipelineError::Config("no remote model client".to_string()))
    }

    /// Classify, pick a template, render. Cannot fail for validated text
    /// once the generator's coverage check has passed.
    pub fn local_reply(&self, text: &str) -> Result<String, PipelineError> {
        let classification = self.classifier.classify(text)?;
        let response = self.generator.generate(&classification)?;
        Ok(response.render())
    }
}

fn advance(phase: &mut TurnPhase, next: TurnPhase, conversation_id: &str) {
    tracing::debug!(
        conversation_id = %conversation_id,
        from = phase.as_str(),
        to = next.as_str(),
        "Turn phase"
    );
    *phase = next;
}
