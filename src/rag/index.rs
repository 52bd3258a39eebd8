//! Document index: an [`Embedder`] bound to one collection of a
//! [`VectorStore`].
//!
//! Insertion embeds in [`EmbeddingMode::Document`], lookup in
//! [`EmbeddingMode::Query`]. The mode is chosen here for each call, so a
//! caller cannot forget to switch it between indexing and querying.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::db::VectorStore;
use crate::rag::embeddings::{Embedder, EmbeddingMode};
use crate::types::{AppError, Document, Result};

/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "documents";

/// Retrieval output, most relevant first. The three vectors are parallel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    /// `1 - similarity`; smaller is closer.
    pub distances: Vec<f32>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Keep only results whose similarity (`1 - distance`) is at least
    /// `min_score`.
    pub fn filter_min_score(self, min_score: f32) -> Self {
        let mut kept = QueryResult::default();
        for ((id, document), distance) in self
            .ids
            .into_iter()
            .zip(self.documents)
            .zip(self.distances)
        {
            if 1.0 - distance >= min_score {
                kept.ids.push(id);
                kept.documents.push(document);
                kept.distances.push(distance);
            }
        }
        kept
    }
}

/// A named collection plus the embedder that feeds it.
#[derive(Clone)]
pub struct DocumentIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    collection: String,
}

impl DocumentIndex {
    /// Bind `embedder` to `collection` in `store`, creating the collection if
    /// it does not exist yet.
    pub async fn open(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        collection: impl Into<String>,
    ) -> Result<Self> {
        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "collection name must not be empty".to_string(),
            ));
        }
        store.get_or_create_collection(&collection).await?;
        info!(
            collection = %collection,
            store = store.provider_name(),
            model = embedder.model_name(),
            "document index ready"
        );
        Ok(Self {
            store,
            embedder,
            collection,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Embed `documents` as documents and store them under `ids`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the batch is empty, the lengths differ, or an id
    /// appears twice. Embedding and store errors propagate unchanged.
    pub async fn add(&self, documents: &[String], ids: &[String]) -> Result<usize> {
        if documents.is_empty() {
            return Err(AppError::InvalidInput("no documents to add".to_string()));
        }
        if documents.len() != ids.len() {
            return Err(AppError::InvalidInput(format!(
                "{} documents but {} ids",
                documents.len(),
                ids.len()
            )));
        }
        let mut seen = HashSet::with_capacity(ids.len());
        if let Some(dup) = ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(AppError::InvalidInput(format!("duplicate id '{}'", dup)));
        }

        let embeddings = self
            .embedder
            .embed(documents, EmbeddingMode::Document)
            .await?;

        let batch: Vec<Document> = ids
            .iter()
            .zip(documents)
            .zip(embeddings)
            .map(|((id, text), embedding)| {
                Document::new(id.clone(), text.clone()).with_embedding(embedding)
            })
            .collect();

        let stored = self.store.upsert(&self.collection, &batch).await?;
        info!(collection = %self.collection, stored, "indexed documents");
        Ok(stored)
    }

    /// [`add`](Self::add) with numeric ids counting up from the current
    /// document count. Ids already present in the collection are skipped, so
    /// no stored document is ever replaced.
    pub async fn add_documents(&self, documents: &[String]) -> Result<usize> {
        let mut ids = Vec::with_capacity(documents.len());
        let mut next = self.count().await?;
        while ids.len() < documents.len() {
            let candidate = next.to_string();
            next += 1;
            if self.store.get(&self.collection, &candidate).await?.is_none() {
                ids.push(candidate);
            }
        }
        self.add(documents, &ids).await
    }

    /// Drop every document in the collection and start over empty.
    pub async fn reset(&self) -> Result<()> {
        self.store.delete_collection(&self.collection).await?;
        self.store.get_or_create_collection(&self.collection).await?;
        info!(collection = %self.collection, "collection reset");
        Ok(())
    }

    /// Embed `query_text` as a query and return up to `top_k` stored
    /// documents, nearest first. A smaller collection yields fewer results.
    pub async fn query(&self, query_text: &str, top_k: usize) -> Result<QueryResult> {
        if top_k == 0 {
            return Err(AppError::InvalidInput("top_k must be at least 1".to_string()));
        }
        let mut embeddings = self
            .embedder
            .embed(&[query_text.to_string()], EmbeddingMode::Query)
            .await?;
        let embedding = embeddings
            .pop()
            .ok_or_else(|| AppError::Embedding("no embedding returned for query".to_string()))?;

        let hits = self
            .store
            .search(&self.collection, &embedding, top_k, f32::MIN)
            .await?;
        debug!(collection = %self.collection, top_k, hits = hits.len(), "query complete");

        let mut result = QueryResult::default();
        for hit in hits.into_iter().take(top_k) {
            result.ids.push(hit.document.id);
            result.documents.push(hit.document.content);
            result.distances.push(1.0 - hit.score);
        }
        Ok(result)
    }

    /// Number of documents in the collection.
    pub async fn count(&self) -> Result<usize> {
        self.store.count(&self.collection).await
    }
}
