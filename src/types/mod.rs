#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

// ============= Document Types =============

/// A stored passage of text.
///
/// `id` is unique within a collection. `embedding` is filled in before the
/// document reaches a vector store and is stripped again from search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    /// Create a document without an embedding.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding: None,
        }
    }

    /// Attach an embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: Document,
    /// Similarity score, higher is closer.
    pub score: f32,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// An external service answered with a non-success HTTP status.
    #[error("{service} returned HTTP {status}: {message}")]
    Upstream {
        service: String,
        status: u16,
        message: String,
    },

    /// The request never produced an HTTP response.
    #[error("{service} request failed: {message}")]
    Transport {
        service: String,
        message: String,
        retriable: bool,
    },

    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<AppError> },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Rate limiting (429) and temporary unavailability (503) are worth
    /// another attempt, as are timeouts and refused connections. Everything
    /// else is returned to the caller as-is.
    pub fn is_retriable(&self) -> bool {
        match self {
            AppError::Upstream { status, .. } => matches!(status, 429 | 503),
            AppError::Transport { retriable, .. } => *retriable,
            _ => false,
        }
    }

    /// HTTP status of an upstream failure, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Upstream { status, .. } => Some(*status),
            AppError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    pub(crate) fn transport(service: &str, err: reqwest::Error) -> Self {
        AppError::Transport {
            service: service.to_string(),
            retriable: err.is_timeout() || err.is_connect(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(status: u16) -> AppError {
        AppError::Upstream {
            service: "gemini".to_string(),
            status,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_rate_limit_and_unavailable_are_retriable() {
        assert!(upstream(429).is_retriable());
        assert!(upstream(503).is_retriable());
    }

    #[test]
    fn test_other_statuses_are_not_retriable() {
        for status in [400, 401, 403, 404, 500, 502] {
            assert!(!upstream(status).is_retriable(), "status {}", status);
        }
        assert!(!AppError::InvalidInput("x".into()).is_retriable());
    }

    #[test]
    fn test_status_is_reported_through_exhaustion() {
        let err = AppError::RetriesExhausted {
            attempts: 3,
            last: Box::new(upstream(503)),
        };
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_document_builder() {
        let doc = Document::new("1", "hello").with_embedding(vec![1.0, 2.0]);
        assert_eq!(doc.id, "1");
        assert_eq!(doc.embedding.as_deref(), Some(&[1.0, 2.0][..]));
    }
}
