//! Mock implementations for testing.
//!
//! This module provides mock LLM clients and embedders that can be used
//! across different test files without duplication.

use async_trait::async_trait;
use docqa::llm::LLMClient;
use docqa::rag::embeddings::validate_batch;
use docqa::rag::{Embedder, EmbeddingMode};
use docqa::types::{AppError, Result};
use parking_lot::Mutex;

/// Mock LLM client for testing with configurable responses.
///
/// Every prompt it receives is recorded so tests can assert on what the
/// pipeline sent.
///
/// # Examples
///
/// ```ignore
/// let client = MockLLMClient::new("Hello, world!");
/// let client = MockLLMClient::failing();
/// ```
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            response: String::new(),
            should_fail: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Bag-of-keywords embedder: dimension `i` counts occurrences of keyword `i`.
///
/// Texts sharing keywords end up close in cosine space, which is enough to
/// exercise retrieval ordering without a network.
pub struct KeywordEmbedder {
    keywords: Vec<&'static str>,
    modes: Mutex<Vec<EmbeddingMode>>,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&'static str]) -> Self {
        Self {
            keywords: keywords.to_vec(),
            modes: Mutex::new(Vec::new()),
        }
    }

    /// Keywords separating the three car manual sections.
    pub fn car_manual() -> Self {
        Self::new(&[
            "touch", "music", "icon", "navigation", "temperature", "airflow", "fan", "defrost",
            "gear", "shift", "park", "reverse",
        ])
    }

    pub fn modes(&self) -> Vec<EmbeddingMode> {
        self.modes.lock().clone()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String], mode: EmbeddingMode) -> Result<Vec<Vec<f32>>> {
        validate_batch(texts)?;
        self.modes.lock().push(mode);
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut vector: Vec<f32> = self
                    .keywords
                    .iter()
                    .map(|k| lower.matches(k).count() as f32)
                    .collect();
                // Non-zero everywhere so cosine similarity is defined.
                vector.push(0.01);
                vector
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}
