//! # docqa - Document Question Answering
//!
//! A small retrieval augmented generation (RAG) pipeline: documents are
//! embedded and stored in a vector index, a question retrieves its nearest
//! passages, and a generative model answers from a prompt assembled out of
//! the question and those passages.
//!
//! ## Overview
//!
//! docqa can be used in two ways:
//!
//! 1. **As a CLI** - Run the `docqa` binary
//! 2. **As a library** - Import the pipeline pieces into your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa::{DocumentIndex, GeminiEmbedder, InMemoryVectorStore, Provider, RagPipeline, RetryPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api_key = std::env::var("GOOGLE_API_KEY")?;
//!     let embedder = GeminiEmbedder::new(
//!         &api_key,
//!         docqa::rag::embeddings::GEMINI_API_BASE,
//!         "text-embedding-004",
//!         std::time::Duration::from_secs(60),
//!         RetryPolicy::default(),
//!     )?;
//!     let index = DocumentIndex::open(
//!         Arc::new(InMemoryVectorStore::new()),
//!         Arc::new(embedder),
//!         "manual",
//!     )
//!     .await?;
//!
//!     let llm = Provider::Gemini {
//!         api_key,
//!         api_base: docqa::rag::embeddings::GEMINI_API_BASE.to_string(),
//!         model: "gemini-2.0-flash".to_string(),
//!         temperature: None,
//!     }
//!     .create_client()
//!     .await?;
//!
//!     let pipeline = RagPipeline::new(index, Arc::from(llm));
//!     pipeline.index_documents(&["The Music icon plays songs.".to_string()]).await?;
//!     let answer = pipeline.answer("How do I play music?").await?;
//!     println!("{}", answer.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI API support |
//!
//! Gemini embeddings and generation are always available.
//!
//! ## Modules
//!
//! - [`cli`] - Command-line parsing and terminal output
//! - [`db`] - Vector store abstraction (in-memory, Chroma)
//! - [`llm`] - LLM client implementations
//! - [`rag`] - Embeddings, index, prompt assembly, retry and the pipeline
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration and HTTP helpers

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line interface for the `docqa` binary.
pub mod cli;
/// Vector stores (in-memory, Chroma).
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (documents, search results, errors).
pub mod types;
/// Configuration and HTTP utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{InMemoryVectorStore, VectorStore, VectorStoreProvider};
pub use llm::{LLMClient, LLMClientFactory, Provider};
pub use rag::{
    Answer, DocumentIndex, Embedder, EmbeddingMode, GeminiEmbedder, PromptTemplate, QueryResult,
    RagPipeline, RetryPolicy,
};
pub use types::{AppError, Result};
pub use utils::config::{ConfigError, DocqaConfig};
