//! LLM Client abstractions and provider management
//!
//! This module provides a unified interface for the answer-synthesis step:
//! - **Gemini**: `generateContent` over HTTP (always available)
//! - **Ollama**: local inference (feature `ollama`)
//! - **OpenAI**: OpenAI and compatible endpoints (feature `openai`)

use std::time::Duration;

use crate::rag::retry::RetryPolicy;
use crate::types::Result;
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing pipeline code. The answer is returned
/// as free text; no structure is imposed on it.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
///
/// | Provider | Feature | Notes |
/// |----------|---------|-------|
/// | Gemini | always | Same API key as the embedder |
/// | Ollama | `ollama` | Local inference |
/// | OpenAI | `openai` | Any OpenAI-compatible endpoint |
#[derive(Debug, Clone)]
pub enum Provider {
    /// Google Gemini API
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Gemini {
    ///     api_key: std::env::var("GOOGLE_API_KEY")?,
    ///     api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
    ///     model: "gemini-2.0-flash".to_string(),
    ///     temperature: None,
    /// };
    /// ```
    Gemini {
        api_key: String,
        api_base: String,
        model: String,
        temperature: Option<f32>,
    },

    /// Ollama local LLM provider
    #[cfg(feature = "ollama")]
    Ollama { base_url: String, model: String },

    /// OpenAI API provider (including compatible APIs)
    #[cfg(feature = "openai")]
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },
}

impl Provider {
    /// Create a client instance with the default retry policy and a 60s
    /// request timeout.
    pub async fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        self.create_client_with(&RetryPolicy::default(), Duration::from_secs(60))
            .await
    }

    /// Create a client instance for this provider.
    ///
    /// `retry` and `timeout` apply to the HTTP clients this crate owns
    /// (Gemini); the SDK-backed providers use their own transport settings.
    ///
    /// # Errors
    ///
    /// Returns an error for missing credentials or an invalid model name.
    pub async fn create_client_with(
        &self,
        retry: &RetryPolicy,
        timeout: Duration,
    ) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::Gemini {
                api_key,
                api_base,
                model,
                temperature,
            } => Ok(Box::new(
                super::gemini::GeminiClient::new(api_key, api_base, model, timeout, retry.clone())?
                    .with_temperature(*temperature),
            )),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone())?,
            )),

            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => {
                if api_key.trim().is_empty() {
                    return Err(crate::types::AppError::Configuration(
                        "missing OpenAI API key".to_string(),
                    ));
                }
                Ok(Box::new(super::openai::OpenAIClient::new(
                    api_key.clone(),
                    api_base.clone(),
                    model.clone(),
                )))
            }
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini { .. } => "Gemini",
            #[cfg(feature = "ollama")]
            Provider::Ollama { .. } => "Ollama",
            #[cfg(feature = "openai")]
            Provider::OpenAI { .. } => "OpenAI",
        }
    }

    /// Model identifier configured for this provider
    pub fn model(&self) -> &str {
        match self {
            Provider::Gemini { model, .. } => model,
            #[cfg(feature = "ollama")]
            Provider::Ollama { model, .. } => model,
            #[cfg(feature = "openai")]
            Provider::OpenAI { model, .. } => model,
        }
    }
}

/// Configuration-based client factory
///
/// Holds the default provider together with the retry policy and timeout
/// every client it builds should use.
///
/// # Example
///
/// ```rust,ignore
/// use docqa::llm::{LLMClientFactory, Provider};
///
/// let factory = LLMClientFactory::new(provider)
///     .with_retry(RetryPolicy::default())
///     .with_timeout(Duration::from_secs(30));
/// let client = factory.create_default().await?;
/// ```
pub struct LLMClientFactory {
    default_provider: Provider,
    retry: RetryPolicy,
    timeout: Duration,
}

impl LLMClientFactory {
    /// Create a new factory with the specified default provider
    pub fn new(default_provider: Provider) -> Self {
        Self {
            default_provider,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a client using the default provider
    pub async fn create_default(&self) -> Result<Box<dyn LLMClient>> {
        self.default_provider
            .create_client_with(&self.retry, self.timeout)
            .await
    }

    /// Create a client using a specific provider
    pub async fn create_with_provider(&self, provider: Provider) -> Result<Box<dyn LLMClient>> {
        provider.create_client_with(&self.retry, self.timeout).await
    }

    /// Get a reference to the default provider
    pub fn default_provider(&self) -> &Provider {
        &self.default_provider
    }
}

#[allow(dead_code)]
fn _assert_object_safe(_: &dyn LLMClient) {}
