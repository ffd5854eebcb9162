//! Pipeline wiring: turns a `MoodwellConfig` into the shared `AppState`
//!
//! Selects the store backend, builds the classifier and empathy generator,
//! and creates the remote model client only when the configured strategy
//! needs one.

use std::sync::Arc;

use moodwell_core::config::StoreBackend;
use moodwell_core::orchestrator::OrchestratorSettings;
use moodwell_core::{
    create_model_client, ConversationStore, EmpathyGenerator, MemoryConversationStore,
    MemoryMoodLog, ModelClient, MoodLog, MoodwellConfig, MoodwellError, PgConversationStore,
    PgMoodLog, ResponseStrategy, SentimentClassifier, TurnOrchestrator,
};
use sqlx::PgPool;

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub moods: Arc<dyn MoodLog>,
    pub pool: Option<PgPool>,
    pub config: MoodwellConfig,
}

impl AppState {
    /// Connects to Postgres and creates tables when the postgres backend is
    /// configured.
    pub async fn from_config(config: MoodwellConfig) -> Result<Self, MoodwellError> {
        let (store, moods, pool): (Arc<dyn ConversationStore>, Arc<dyn MoodLog>, Option<PgPool>) =
            match config.store.backend {
                StoreBackend::Memory => (
                    Arc::new(MemoryConversationStore::new()),
                    Arc::new(MemoryMoodLog::new()),
                    None,
                ),
                StoreBackend::Postgres => {
                    let pool = moodwell_core::db::create_pool(&config.store).await?;
                    let turns = PgConversationStore::new(pool.clone());
                    let moods = PgMoodLog::new(pool.clone());
                    turns.ensure_schema().await?;
                    moods.ensure_schema().await?;
                    (Arc::new(turns), Arc::new(moods), Some(pool))
                }
            };

        let orchestrator = build_orchestrator(&config, store)?;
        Ok(Self::new(orchestrator, moods, pool, config))
    }

    pub fn new(
        orchestrator: TurnOrchestrator,
        moods: Arc<dyn MoodLog>,
        pool: Option<PgPool>,
        config: MoodwellConfig,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            moods,
            pool,
            config,
        }
    }
}

/// Build the orchestrator over `store`. The remote client is only created
/// for the `remote` and `hybrid` strategies.
pub fn build_orchestrator(
    config: &MoodwellConfig,
    store: Arc<dyn ConversationStore>,
) -> Result<TurnOrchestrator, MoodwellError> {
    let classifier = SentimentClassifier::new(&config.classifier)?;
    let generator = EmpathyGenerator::new(config.empathy.selection, config.empathy.templates.clone())?;

    let model: Option<Arc<dyn ModelClient>> = match config.pipeline.strategy {
        ResponseStrategy::Local => None,
        ResponseStrategy::Remote | ResponseStrategy::Hybrid => {
            Some(Arc::from(create_model_client(&config.remote)?))
        }
    };

    tracing::info!(
        strategy = ?config.pipeline.strategy,
        persistence = ?config.pipeline.persistence,
        store = store.name(),
        model = model.as_ref().map(|m| m.name()).unwrap_or("none"),
        selection = ?generator.policy(),
        "Turn pipeline ready"
    );

    let orchestrator = TurnOrchestrator::new(
        store,
        classifier,
        generator,
        model,
        OrchestratorSettings {
            strategy: config.pipeline.strategy,
            persistence: config.pipeline.persistence,
        },
    )?;
    Ok(orchestrator)
}
