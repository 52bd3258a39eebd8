//! TOML-based configuration for docqa
//!
//! Every field has a default, so an empty or missing `docqa.toml` yields a
//! working setup (Gemini for embeddings and generation, in-memory vector
//! store). Secrets are never stored in the file: sections name the
//! environment variable that holds them (`api_key_env`).
//!
//! ```toml
//! [embedding]
//! model = "models/text-embedding-004"
//!
//! [llm]
//! provider = "gemini"
//! model = "models/gemini-2.0-flash"
//!
//! [vector_store]
//! provider = "chroma"
//! url = "http://localhost:8000"
//!
//! [retrieval]
//! top_k = 1
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::VectorStoreProvider;
use crate::llm::{Provider, DEFAULT_GENERATION_MODEL};
use crate::rag::embeddings::{DEFAULT_EMBEDDING_MODEL, GEMINI_API_BASE};
use crate::rag::index::DEFAULT_COLLECTION;
use crate::rag::pipeline::DEFAULT_TOP_K;
use crate::rag::prompt::PromptTemplate;
use crate::rag::retry::RetryPolicy;
use crate::types::AppError;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "docqa.toml";

/// Root configuration structure loaded from docqa.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocqaConfig {
    pub logging: LoggingConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    /// Unset means "decide from the environment" (`CHROMA_URL`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_store: Option<VectorStoreProvider>,
    pub retrieval: RetrievalConfig,
    pub retry: RetryPolicy,
    pub prompt: PromptTemplate,
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ============= Embedding Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Environment variable name containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gemini_api_base() -> String {
    GEMINI_API_BASE.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_base: default_gemini_api_base(),
            model: default_embedding_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============= LLM Configuration =============

/// Which backend answers the assembled prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Gemini,
    Ollama,
    OpenAI,
}

impl LlmProviderKind {
    pub fn name(self) -> &'static str {
        match self {
            LlmProviderKind::Gemini => "gemini",
            LlmProviderKind::Ollama => "ollama",
            LlmProviderKind::OpenAI => "openai",
        }
    }

    /// Model used when `[llm] model` is unset.
    pub fn default_model(self) -> &'static str {
        match self {
            LlmProviderKind::Gemini => DEFAULT_GENERATION_MODEL,
            LlmProviderKind::Ollama => "llama3.2",
            LlmProviderKind::OpenAI => "gpt-4o-mini",
        }
    }

    /// Endpoint used when `[llm] api_base` is unset.
    pub fn default_api_base(self) -> &'static str {
        match self {
            LlmProviderKind::Gemini => GEMINI_API_BASE,
            LlmProviderKind::Ollama => "http://localhost:11434",
            LlmProviderKind::OpenAI => "https://api.openai.com/v1",
        }
    }

    /// Key variable used when `[llm] api_key_env` is unset. Ollama needs none.
    pub fn default_api_key_env(self) -> Option<&'static str> {
        match self {
            LlmProviderKind::Gemini => Some("GOOGLE_API_KEY"),
            LlmProviderKind::Ollama => None,
            LlmProviderKind::OpenAI => Some("OPENAI_API_KEY"),
        }
    }
}

/// `[llm]` section. Unset fields take the selected provider's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProviderKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// API base for Gemini/OpenAI, server URL for Ollama.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Environment variable name containing the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            model: None,
            api_base: None,
            api_key_env: None,
            temperature: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_base())
    }

    /// `None` when the provider takes no key and none was configured.
    pub fn api_key_env(&self) -> Option<&str> {
        self.api_key_env
            .as_deref()
            .or_else(|| self.provider.default_api_key_env())
    }
}

// ============= Retrieval Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Drop passages whose similarity is below this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,

    /// Fail instead of asking the model when nothing was retrieved.
    #[serde(default)]
    pub require_passages: bool,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            top_k: default_top_k(),
            min_score: None,
            require_passages: false,
        }
    }
}

// ============= Errors =============

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

// ============= Loading =============

impl DocqaConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: DocqaConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given (it must exist), otherwise `docqa.toml` in the
    /// working directory when present, otherwise the defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Check internal consistency. Environment variables are checked
    /// separately by [`validate_env`](Self::validate_env).
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(msg: impl Into<String>) -> Result<(), ConfigError> {
            Err(ConfigError::ValidationError(msg.into()))
        }

        if self.embedding.model.trim().is_empty() {
            return invalid("embedding.model must not be empty");
        }
        if self.llm.model().trim().is_empty() {
            return invalid("llm.model must not be empty");
        }
        if self.llm.api_base().trim().is_empty() {
            return invalid("llm.api_base must not be empty");
        }
        if self.embedding.request_timeout_secs == 0 || self.llm.request_timeout_secs == 0 {
            return invalid("request_timeout_secs must be at least 1");
        }
        if let Some(t) = self.llm.temperature {
            if !(0.0..=2.0).contains(&t) {
                return invalid(format!("llm.temperature {} is outside 0.0..=2.0", t));
            }
        }
        if self.retrieval.collection.trim().is_empty() {
            return invalid("retrieval.collection must not be empty");
        }
        if self.retrieval.top_k == 0 {
            return invalid("retrieval.top_k must be at least 1");
        }
        if let Some(min) = self.retrieval.min_score {
            if !(-1.0..=1.0).contains(&min) {
                return invalid(format!("retrieval.min_score {} is outside -1.0..=1.0", min));
            }
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1");
        }
        if self.retry.multiplier < 1.0 {
            return invalid("retry.multiplier must be at least 1.0");
        }
        if self.retry.initial_backoff > self.retry.max_backoff {
            return invalid("retry.initial_backoff exceeds retry.max_backoff");
        }
        if let Some(VectorStoreProvider::Chroma {
            url,
            tenant,
            database,
        }) = &self.vector_store
        {
            if url.trim().is_empty() {
                return invalid("vector_store.url must not be empty");
            }
            if tenant.trim().is_empty() || database.trim().is_empty() {
                return invalid("vector_store.tenant and vector_store.database must not be empty");
            }
        }
        Ok(())
    }

    /// Check that every environment variable the configured backends need
    /// is set.
    pub fn validate_env(&self) -> Result<(), ConfigError> {
        self.embedding_api_key()?;
        if self.llm.provider != LlmProviderKind::Ollama {
            self.llm_api_key()?;
        }
        Ok(())
    }

    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }

    /// API key for the embedding service.
    pub fn embedding_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.embedding.api_key_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.embedding.api_key_env.clone()))
    }

    /// API key for the generation service.
    pub fn llm_api_key(&self) -> Result<String, ConfigError> {
        let name = self.llm.api_key_env().ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "llm.api_key_env is required for provider '{}'",
                self.llm.provider.name()
            ))
        })?;
        self.resolve_env(name)
            .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
    }

    /// Configured vector store, or the one `CHROMA_URL` selects.
    pub fn vector_store(&self) -> VectorStoreProvider {
        self.vector_store
            .clone()
            .unwrap_or_else(VectorStoreProvider::from_env)
    }

    /// Build the LLM provider described by `[llm]`, resolving its API key.
    pub fn llm_provider(&self) -> Result<Provider, ConfigError> {
        match self.llm.provider {
            LlmProviderKind::Gemini => Ok(Provider::Gemini {
                api_key: self.llm_api_key()?,
                api_base: self.llm.api_base().to_string(),
                model: self.llm.model().to_string(),
                temperature: self.llm.temperature,
            }),

            #[cfg(feature = "ollama")]
            LlmProviderKind::Ollama => Ok(Provider::Ollama {
                base_url: self.llm.api_base().to_string(),
                model: self.llm.model().to_string(),
            }),

            #[cfg(feature = "openai")]
            LlmProviderKind::OpenAI => Ok(Provider::OpenAI {
                api_key: self.llm_api_key()?,
                api_base: self.llm.api_base().to_string(),
                model: self.llm.model().to_string(),
            }),

            #[allow(unreachable_patterns)]
            other => Err(ConfigError::ValidationError(format!(
                "llm.provider '{}' is not compiled in; rebuild with its feature enabled",
                other.name()
            ))),
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = DocqaConfig::from_toml("").unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.embedding.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.embedding.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(config.llm.provider, LlmProviderKind::Gemini);
        assert_eq!(config.retrieval.top_k, 1);
        assert_eq!(config.retrieval.collection, "documents");
        assert!(config.retrieval.min_score.is_none());
        assert!(!config.retrieval.require_passages);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.prompt, PromptTemplate::default());
        assert!(config.vector_store.is_none());
    }

    #[test]
    fn test_parse_sections() {
        let config = DocqaConfig::from_toml(
            r#"
            [logging]
            level = "debug"
            json = true

            [llm]
            provider = "ollama"
            model = "llama3.2"
            api_base = "http://localhost:11434"

            [vector_store]
            provider = "chroma"
            url = "http://localhost:8000"

            [retrieval]
            top_k = 3
            min_score = 0.25
            require_passages = true

            [retry]
            max_attempts = 2

            [prompt]
            preamble = "Answer briefly."
            "#,
        )
        .unwrap();

        assert!(config.logging.json);
        assert_eq!(config.llm.provider, LlmProviderKind::Ollama);
        assert_eq!(config.llm.model(), "llama3.2");
        assert_eq!(
            config.vector_store,
            Some(VectorStoreProvider::chroma("http://localhost:8000"))
        );
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.min_score, Some(0.25));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.multiplier, 2.0);
        assert_eq!(config.prompt.preamble, "Answer briefly.");
    }

    #[test]
    fn test_llm_defaults_follow_gemini() {
        let config = DocqaConfig::from_toml("").unwrap();

        assert_eq!(config.llm.model(), DEFAULT_GENERATION_MODEL);
        assert_eq!(config.llm.api_base(), GEMINI_API_BASE);
        assert_eq!(config.llm.api_key_env(), Some("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_llm_defaults_follow_ollama() {
        let config =
            DocqaConfig::from_toml("[llm]\nprovider = \"ollama\"\nmodel = \"llama3.2\"\n").unwrap();

        assert_eq!(config.llm.api_base(), "http://localhost:11434");
        assert_eq!(config.llm.api_key_env(), None);
        assert!(config.llm_api_key().is_err());
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn test_ollama_provider_points_at_local_server() {
        let config = DocqaConfig::from_toml("[llm]\nprovider = \"ollama\"\n").unwrap();

        match config.llm_provider().unwrap() {
            Provider::Ollama { base_url, model } => {
                assert_eq!(base_url, "http://localhost:11434");
                assert_eq!(model, "llama3.2");
            }
            other => panic!("expected Ollama, got {}", other.name()),
        }
    }

    #[test]
    fn test_llm_defaults_follow_openai() {
        let config = DocqaConfig::from_toml("[llm]\nprovider = \"openai\"\n").unwrap();

        assert_eq!(config.llm.model(), "gpt-4o-mini");
        assert_eq!(config.llm.api_base(), "https://api.openai.com/v1");
        assert_eq!(config.llm.api_key_env(), Some("OPENAI_API_KEY"));
    }

    #[test]
    fn test_explicit_llm_settings_win_over_provider_defaults() {
        let config = DocqaConfig::from_toml(
            r#"
            [llm]
            provider = "openai"
            model = "local-model"
            api_base = "http://localhost:8080/v1"
            api_key_env = "LOCAL_LLM_KEY"
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.model(), "local-model");
        assert_eq!(config.llm.api_base(), "http://localhost:8080/v1");
        assert_eq!(config.llm.api_key_env(), Some("LOCAL_LLM_KEY"));
    }

    #[test]
    fn test_validation_rejects_zero_top_k() {
        let result = DocqaConfig::from_toml("[retrieval]\ntop_k = 0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_rejects_zero_attempts() {
        let result = DocqaConfig::from_toml("[retry]\nmax_attempts = 0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_unknown_llm_provider_is_a_parse_error() {
        let result = DocqaConfig::from_toml("[llm]\nprovider = \"mystery\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_api_key_env() {
        let config = DocqaConfig::from_toml(
            "[embedding]\napi_key_env = \"DOCQA_TEST_UNSET_KEY_4F2A\"\n",
        )
        .unwrap();
        let err = config.embedding_api_key().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref name) if name == "DOCQA_TEST_UNSET_KEY_4F2A"));
        assert!(matches!(AppError::from(err), AppError::Configuration(_)));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = DocqaConfig::default();
        let rendered = config.to_toml().unwrap();
        let parsed = DocqaConfig::from_toml(&rendered).unwrap();
        assert_eq!(parsed.retry, config.retry);
        assert_eq!(parsed.embedding.model, config.embedding.model);
    }
}
