use std::collections::HashMap;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::empathy::{EmpathyTemplate, SelectionPolicy};
use crate::models::MoodCategory;
use crate::orchestrator::{PersistenceMode, ResponseStrategy};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MoodwellConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub empathy: EmpathyConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub socket_path: String,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: "/tmp/moodwell.sock".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8780,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    #[serde(default)]
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub strategy: ResponseStrategy,
    #[serde(default)]
    pub persistence: PersistenceMode,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub model: String,
    /// Empty means "read GOOGLE_API_KEY from the environment".
    #[serde(default)]
    pub api_key: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: crate::remote::DEFAULT_BASE_URL.to_string(),
            model: crate::remote::DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

impl RemoteConfig {
    pub fn resolved_api_key(&self) -> String {
        if self.api_key.is_empty() {
            std::env::var("GOOGLE_API_KEY").unwrap_or_default()
        } else {
            self.api_key.clone()
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmpathyConfig {
    #[serde(default)]
    pub selection: SelectionPolicy,
    /// Added on top of the built-in table.
    #[serde(default)]
    pub templates: Vec<EmpathyTemplate>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    pub default_category: MoodCategory,
    /// Category name -> additional keywords.
    #[serde(default)]
    pub extra_keywords: HashMap<String, Vec<String>>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            default_category: MoodCategory::Content,
            extra_keywords: HashMap::new(),
        }
    }
}

impl MoodwellConfig {
    /// Load from a TOML file, then apply `MOODWELL__SECTION__KEY` overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("MOODWELL").separator("__"))
            .build()?;
        s.try_deserialize()
    }
}
