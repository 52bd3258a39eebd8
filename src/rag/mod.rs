//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! The pieces of a single-turn question answering run over a document
//! collection.
//!
//! # Module Structure
//!
//! - [`embeddings`] - Embedding adapter with explicit document/query mode
//! - [`index`] - A collection of a vector store plus the embedder that fills it
//! - [`prompt`] - Prompt assembly from a question and retrieved passages
//! - [`retry`] - Bounded exponential backoff for rate limits and outages
//! - [`pipeline`] - Retrieve, assemble, generate
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - Documents are embedded in document mode and stored
//! 2. **Retrieval** - The question is embedded in query mode, nearest passages returned
//! 3. **Assembly** - Preamble, question and passages become one prompt
//! 4. **Generation** - The model answers from the prompt
//!
//! # Example
//!
//! ```ignore
//! use docqa::rag::{index::DocumentIndex, pipeline::RagPipeline};
//!
//! let index = DocumentIndex::open(store, embedder, "manual").await?;
//! let pipeline = RagPipeline::new(index, llm).with_top_k(1);
//!
//! pipeline.index_documents(&passages).await?;
//! let answer = pipeline.answer("How do I use the touchscreen?").await?;
//! println!("{}", answer.text);
//! ```

#![allow(missing_docs)]

pub mod embeddings;
pub mod index;
pub mod pipeline;
pub mod prompt;
pub mod retry;

pub use embeddings::{Embedder, EmbeddingMode, GeminiEmbedder, TaskType};
pub use index::{DocumentIndex, QueryResult};
pub use pipeline::{Answer, RagPipeline};
pub use prompt::PromptTemplate;
pub use retry::RetryPolicy;
