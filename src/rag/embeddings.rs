//! Dense text embeddings.
//!
//! An [`Embedder`] turns an ordered batch of texts into an ordered batch of
//! vectors of the same length. The caller says on every call whether the texts
//! are documents being stored or a query being searched for
//! ([`EmbeddingMode`]); the mode picks the task type forwarded to the
//! embedding service, which may optimise the two kinds of vectors differently.
//!
//! [`GeminiEmbedder`] talks to the Gemini `batchEmbedContents` endpoint, one
//! HTTP call per batch, under a bounded [`RetryPolicy`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rag::retry::RetryPolicy;
use crate::types::{AppError, Result};
use crate::utils::http::{check_status, json_client, secret_header};

/// Default Gemini API root.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default Gemini embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/text-embedding-004";

const SERVICE: &str = "gemini";

/// Which side of retrieval a batch of texts belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// Texts that will be stored in the index.
    Document,
    /// Text that will be searched for.
    Query,
}

impl EmbeddingMode {
    /// Task type sent to the embedding service for this mode.
    pub fn task_type(self) -> TaskType {
        match self {
            EmbeddingMode::Document => TaskType::RetrievalDocument,
            EmbeddingMode::Query => TaskType::RetrievalQuery,
        }
    }
}

/// Embedding task hint understood by the Gemini API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

impl TaskType {
    /// Lowercase name, e.g. `retrieval_document`.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::RetrievalDocument => "retrieval_document",
            TaskType::RetrievalQuery => "retrieval_query",
        }
    }
}

/// Maps an ordered batch of texts to an ordered batch of vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `texts` for the given retrieval side.
    ///
    /// The returned vector has exactly one embedding per input, in input order.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty batch or an empty text, `Upstream` for
    /// non-retriable service errors, `RetriesExhausted` when transient errors
    /// outlast the retry policy.
    async fn embed(&self, texts: &[String], mode: EmbeddingMode) -> Result<Vec<Vec<f32>>>;

    /// Model identifier used for embedding.
    fn model_name(&self) -> &str;
}

/// Reject batches the embedding service would refuse anyway.
pub fn validate_batch(texts: &[String]) -> Result<()> {
    if texts.is_empty() {
        return Err(AppError::InvalidInput(
            "cannot embed an empty batch".to_string(),
        ));
    }
    if let Some(pos) = texts.iter().position(|t| t.trim().is_empty()) {
        return Err(AppError::InvalidInput(format!(
            "text at position {} is empty",
            pos
        )));
    }
    Ok(())
}

/// Gemini embedding client.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    retry: RetryPolicy,
}

impl GeminiEmbedder {
    /// Builds a new Gemini embeddings client.
    ///
    /// # Arguments
    /// * `api_key` - Value for the `x-goog-api-key` header
    /// * `api_base` - API root, usually [`GEMINI_API_BASE`]
    /// * `model` - Model name with or without the `models/` prefix
    pub fn new(
        api_key: &str,
        api_base: &str,
        model: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Configuration("missing Gemini API key".to_string()));
        }
        let model = qualified_model(model)?;
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", secret_header(SERVICE, api_key)?);
        let client = json_client(SERVICE, headers, timeout)?;
        let endpoint = format!(
            "{}/{}:batchEmbedContents",
            api_base.trim_end_matches('/'),
            model
        );
        Ok(Self {
            client,
            endpoint,
            model,
            retry,
        })
    }

    /// Endpoint the batches are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Normalise a Gemini model name to the `models/<name>` form.
pub(crate) fn qualified_model(model: &str) -> Result<String> {
    let model = model.trim();
    let bare = model.strip_prefix("models/").unwrap_or(model);
    if bare.is_empty() {
        return Err(AppError::Configuration("missing Gemini model name".to_string()));
    }
    Ok(format!("models/{}", bare))
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, texts: &[String], mode: EmbeddingMode) -> Result<Vec<Vec<f32>>> {
        validate_batch(texts)?;
        let task_type = mode.task_type();
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.model,
                    content: Content {
                        parts: vec![Part {
                            text: text.as_str(),
                        }],
                    },
                    task_type,
                })
                .collect(),
        };

        debug!(
            model = %self.model,
            task_type = task_type.as_str(),
            batch = texts.len(),
            "embedding batch"
        );

        let request = &request;
        let payload: BatchEmbedResponse = self
            .retry
            .run("gemini.batchEmbedContents", move || async move {
                let response = self
                    .client
                    .post(&self.endpoint)
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| AppError::transport(SERVICE, e))?;
                let response = check_status(SERVICE, response).await?;
                response.json().await.map_err(|e| {
                    AppError::Embedding(format!("failed to parse Gemini embedding response: {}", e))
                })
            })
            .await?;

        payload.into_vectors(texts.len())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

impl BatchEmbedResponse {
    fn into_vectors(self, expected_len: usize) -> Result<Vec<Vec<f32>>> {
        if self.embeddings.len() != expected_len {
            return Err(AppError::Embedding(format!(
                "Gemini returned {} embeddings for {} inputs",
                self.embeddings.len(),
                expected_len
            )));
        }
        if let Some(pos) = self.embeddings.iter().position(|e| e.values.is_empty()) {
            return Err(AppError::Embedding(format!(
                "Gemini returned an empty embedding at position {}",
                pos
            )));
        }
        Ok(self.embeddings.into_iter().map(|e| e.values).collect())
    }
}
