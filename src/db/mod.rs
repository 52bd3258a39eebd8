//! Vector stores.
//!
//! This module provides the vector index abstraction used by retrieval:
//! - **In-memory**: brute-force cosine scan, no external process
//! - **Chroma**: remote Chroma server over REST
//!
//! Pick a backend at runtime through [`VectorStoreProvider`] (the
//! `[vector_store]` config section, or `CHROMA_URL` in the environment).

#![allow(missing_docs)]

// Vector store abstraction layer
pub mod vectorstore;

// Provider implementations
pub mod chromadb;

// Re-exports
pub use chromadb::ChromaStore;
pub use vectorstore::{
    CollectionInfo, CollectionStats, InMemoryVectorStore, VectorStore, VectorStoreProvider,
};
