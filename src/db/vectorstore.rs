//! The vector store seam.
//!
//! Retrieval only needs four things from a backend: make sure a collection
//! exists, upsert embedded documents, rank them against a query vector and
//! count them. [`VectorStore`] carries those plus a handful of housekeeping
//! calls; [`VectorStoreProvider`] picks an implementation at runtime.
//!
//! ```rust,ignore
//! use docqa::db::VectorStoreProvider;
//!
//! let store = VectorStoreProvider::chroma("http://localhost:8000")
//!     .create_store()
//!     .await?;
//! store.get_or_create_collection("manual").await?;
//! store.upsert("manual", &documents).await?;
//! let hits = store.search("manual", &query_vector, 3, f32::MIN).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::{AppError, Document, Result, SearchResult};

/// Which backend to build, as read from `[vector_store]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Process-local map, gone on exit.
    #[default]
    #[serde(alias = "in-memory", alias = "inmemory")]
    Memory,

    /// A Chroma server reached over its REST API.
    Chroma {
        /// Base URL, e.g. `http://localhost:8000`.
        url: String,
        #[serde(default = "default_tenant")]
        tenant: String,
        #[serde(default = "default_database")]
        database: String,
    },
}

fn default_tenant() -> String {
    super::chromadb::DEFAULT_TENANT.to_string()
}

fn default_database() -> String {
    super::chromadb::DEFAULT_DATABASE.to_string()
}

impl VectorStoreProvider {
    /// Chroma at `url` in the default tenant and database.
    pub fn chroma(url: impl Into<String>) -> Self {
        VectorStoreProvider::Chroma {
            url: url.into(),
            tenant: default_tenant(),
            database: default_database(),
        }
    }

    /// Build the configured store.
    pub async fn create_store(&self) -> Result<Box<dyn VectorStore>> {
        Ok(match self {
            VectorStoreProvider::Memory => Box::new(InMemoryVectorStore::new()),
            VectorStoreProvider::Chroma {
                url,
                tenant,
                database,
            } => Box::new(super::chromadb::ChromaStore::new(url)?.in_database(tenant, database)),
        })
    }

    /// `CHROMA_URL` when set and non-blank, the in-memory store otherwise.
    pub fn from_env() -> Self {
        std::env::var("CHROMA_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(VectorStoreProvider::chroma)
            .unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        match self {
            VectorStoreProvider::Memory => "in-memory",
            VectorStoreProvider::Chroma { .. } => "chroma",
        }
    }
}

/// Size and shape of one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    pub name: String,
    pub document_count: usize,
    /// 0 until the first upsert.
    pub dimensions: usize,
    pub distance_metric: String,
}

/// Entry returned by [`VectorStore::list_collections`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub document_count: usize,
    pub dimensions: usize,
}

/// Storage and nearest-neighbour lookup for embedded documents.
///
/// Scores are similarities: higher means closer. Implementations must return
/// search hits best first and without their embeddings.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Fails when `name` is already taken.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Idempotent; the first upsert fixes the vector width.
    async fn get_or_create_collection(&self, name: &str) -> Result<()>;

    async fn delete_collection(&self, name: &str) -> Result<()>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    async fn collection_stats(&self, name: &str) -> Result<CollectionStats>;

    /// Insert or replace by id. Every document must carry an embedding of the
    /// collection's width; a bad batch is rejected as a whole.
    async fn upsert(&self, collection: &str, documents: &[Document]) -> Result<usize>;

    /// Up to `limit` documents scoring at least `threshold`, best first.
    /// `f32::MIN` disables the threshold.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Returns how many of `ids` were present.
    async fn delete(&self, collection: &str, ids: &[String]) -> Result<usize>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.collection_stats(collection).await?.document_count)
    }
}

/// Cosine of the angle between `a` and `b`. Mismatched lengths and zero
/// vectors give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut aa, mut bb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        aa += x * x;
        bb += y * y;
    }
    if aa == 0.0 || bb == 0.0 {
        return 0.0;
    }
    dot / (aa.sqrt() * bb.sqrt())
}

#[derive(Default)]
struct Collection {
    dimensions: usize,
    documents: HashMap<String, Document>,
}

/// Brute-force store kept in a `HashMap` behind a lock.
#[derive(Default, Clone)]
pub struct InMemoryVectorStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(name: &str) -> AppError {
    AppError::NotFound(format!("Collection '{}' not found", name))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut map = self.collections.write();
        if map.contains_key(name) {
            return Err(AppError::InvalidInput(format!(
                "Collection '{}' already exists",
                name
            )));
        }
        map.insert(
            name.to_string(),
            Collection {
                dimensions,
                documents: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn get_or_create_collection(&self, name: &str) -> Result<()> {
        self.collections
            .write()
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| missing(name))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let mut infos: Vec<CollectionInfo> = self
            .collections
            .read()
            .iter()
            .map(|(name, c)| CollectionInfo {
                name: name.clone(),
                document_count: c.documents.len(),
                dimensions: c.dimensions,
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().contains_key(name))
    }

    async fn collection_stats(&self, name: &str) -> Result<CollectionStats> {
        let map = self.collections.read();
        let c = map.get(name).ok_or_else(|| missing(name))?;
        Ok(CollectionStats {
            name: name.to_string(),
            document_count: c.documents.len(),
            dimensions: c.dimensions,
            distance_metric: "cosine".to_string(),
        })
    }

    async fn upsert(&self, collection: &str, documents: &[Document]) -> Result<usize> {
        let mut map = self.collections.write();
        let c = map.get_mut(collection).ok_or_else(|| missing(collection))?;

        let mut width = c.dimensions;
        for doc in documents {
            let Some(embedding) = doc.embedding.as_ref() else {
                return Err(AppError::InvalidInput(format!(
                    "Document '{}' is missing embedding",
                    doc.id
                )));
            };
            if width == 0 {
                width = embedding.len();
            }
            if embedding.len() != width {
                return Err(AppError::InvalidInput(format!(
                    "Document '{}' has {} dimensions, collection '{}' expects {}",
                    doc.id,
                    embedding.len(),
                    collection,
                    width
                )));
            }
        }

        c.dimensions = width;
        c.documents
            .extend(documents.iter().map(|d| (d.id.clone(), d.clone())));
        Ok(documents.len())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        let map = self.collections.read();
        let c = map.get(collection).ok_or_else(|| missing(collection))?;

        if c.dimensions != 0 && embedding.len() != c.dimensions {
            return Err(AppError::InvalidInput(format!(
                "Query has {} dimensions, collection '{}' expects {}",
                embedding.len(),
                collection,
                c.dimensions
            )));
        }

        let mut hits: Vec<SearchResult> = c
            .documents
            .values()
            .filter_map(|doc| {
                let score = cosine_similarity(embedding, doc.embedding.as_deref()?);
                (score >= threshold).then(|| SearchResult {
                    document: Document::new(doc.id.clone(), doc.content.clone()),
                    score,
                })
            })
            .collect();

        // ties fall back to id order
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<usize> {
        let mut map = self.collections.write();
        let c = map.get_mut(collection).ok_or_else(|| missing(collection))?;
        Ok(ids
            .iter()
            .filter(|id| c.documents.remove(id.as_str()).is_some())
            .count())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let map = self.collections.read();
        let c = map.get(collection).ok_or_else(|| missing(collection))?;
        Ok(c.documents.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str, v: &[f32]) -> Document {
        Document::new(id, text).with_embedding(v.to_vec())
    }

    async fn store_with(docs: &[Document]) -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new();
        store.get_or_create_collection("c").await.unwrap();
        if !docs.is_empty() {
            store.upsert("c", docs).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 3).await.unwrap();
        assert!(store.collection_exists("c").await.unwrap());
        assert!(store.create_collection("c", 3).await.is_err());
    }

    #[tokio::test]
    async fn test_get_or_create_keeps_contents() {
        let store = store_with(&[doc("a", "A", &[1.0, 0.0])]).await;

        store.get_or_create_collection("c").await.unwrap();

        let stats = store.collection_stats("c").await.unwrap();
        assert_eq!(stats.document_count, 1);
        assert_eq!(stats.dimensions, 2);
    }

    #[tokio::test]
    async fn test_search_threshold_and_order() {
        let store = store_with(&[
            doc("east", "points east", &[1.0, 0.0, 0.0]),
            doc("north", "points north", &[0.0, 1.0, 0.0]),
            doc("mostly-east", "almost east", &[0.9, 0.1, 0.0]),
        ])
        .await;

        let hits = store.search("c", &[1.0, 0.0, 0.0], 10, 0.5).await.unwrap();

        let ids: Vec<&str> = hits.iter().map(|h| h.document.id.as_str()).collect();
        assert_eq!(ids, vec!["east", "mostly-east"]);
        assert!(hits.iter().all(|h| h.document.embedding.is_none()));
    }

    #[tokio::test]
    async fn test_limit_larger_than_collection() {
        let store = store_with(&[doc("a", "A", &[1.0, 0.0]), doc("b", "B", &[0.0, 1.0])]).await;

        let hits = store.search("c", &[1.0, 1.0], 10, f32::MIN).await.unwrap();

        assert_eq!(hits.len(), 2);
        // equal scores, so id order decides
        assert_eq!(hits[0].document.id, "a");
    }

    #[tokio::test]
    async fn test_bad_batches_leave_collection_untouched() {
        let store = store_with(&[]).await;

        let no_vector = store.upsert("c", &[Document::new("x", "bare")]).await;
        let mixed = store
            .upsert("c", &[doc("a", "A", &[1.0, 0.0]), doc("b", "B", &[1.0, 0.0, 0.0])])
            .await;

        assert!(matches!(no_vector, Err(AppError::InvalidInput(_))));
        assert!(matches!(mixed, Err(AppError::InvalidInput(_))));
        assert_eq!(store.count("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = store_with(&[doc("a", "old", &[1.0, 0.0])]).await;

        store.upsert("c", &[doc("a", "new", &[0.0, 1.0])]).await.unwrap();

        assert_eq!(store.count("c").await.unwrap(), 1);
        assert_eq!(store.get("c", "a").await.unwrap().unwrap().content, "new");
    }

    #[tokio::test]
    async fn test_delete_counts_only_present_ids() {
        let store = store_with(&[doc("a", "A", &[1.0])]).await;

        let removed = store
            .delete("c", &["a".to_string(), "zzz".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.count("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_not_found() {
        let store = InMemoryVectorStore::new();
        let result = store.search("nope", &[1.0], 1, 0.0).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(store.delete_collection("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let store = InMemoryVectorStore::new();
        store.create_collection("zeta", 2).await.unwrap();
        store.create_collection("alpha", 4).await.unwrap();

        let names: Vec<String> = store
            .list_collections()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();

        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[2.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_provider_from_toml() {
        let chroma: VectorStoreProvider =
            toml::from_str("provider = \"chroma\"\nurl = \"http://localhost:8000\"").unwrap();
        assert_eq!(chroma.name(), "chroma");
        assert_eq!(chroma, VectorStoreProvider::chroma("http://localhost:8000"));

        let scoped: VectorStoreProvider = toml::from_str(
            "provider = \"chroma\"\nurl = \"http://chroma:8000\"\ntenant = \"acme\"\ndatabase = \"manuals\"",
        )
        .unwrap();
        assert_eq!(
            scoped,
            VectorStoreProvider::Chroma {
                url: "http://chroma:8000".to_string(),
                tenant: "acme".to_string(),
                database: "manuals".to_string(),
            }
        );

        let memory: VectorStoreProvider = toml::from_str("provider = \"in-memory\"").unwrap();
        assert_eq!(memory, VectorStoreProvider::Memory);
    }
}
