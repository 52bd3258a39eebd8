//! Chroma vector database integration.
//!
//! Talks to a Chroma server over its v2 REST API, inside one tenant and
//! database (`default_tenant` / `default_database` unless configured).
//! Embeddings are computed on our side and passed in explicitly; Chroma only
//! stores them and runs the nearest-neighbour search. Collections must use the
//! cosine space so that `1 - distance` is the cosine similarity; a collection
//! found with any other space is refused.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa::db::ChromaStore;
//!
//! let store = ChromaStore::new("http://localhost:8000")?;
//! store.get_or_create_collection("manual").await?;
//! store.upsert("manual", &documents).await?;
//! let results = store.search("manual", &query_embedding, 1, f32::MIN).await?;
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::vectorstore::{CollectionInfo, CollectionStats, VectorStore};
use crate::types::{AppError, Document, Result, SearchResult};
use crate::utils::http::{check_status, json_client};

const SERVICE: &str = "chroma";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const SPACE_KEY: &str = "hnsw:space";

/// Tenant used when none is configured.
pub const DEFAULT_TENANT: &str = "default_tenant";
/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "default_database";

/// Chroma REST client implementing [`VectorStore`].
pub struct ChromaStore {
    client: Client,
    server: String,
    /// `{server}/api/v2/tenants/{tenant}/databases/{database}`
    base_url: String,
    /// Collection name -> Chroma collection id.
    ids: RwLock<HashMap<String, String>>,
}

impl ChromaStore {
    /// Create a client for the Chroma server at `url`.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::Configuration(
                "Chroma URL must be an http(s) URL".to_string(),
            ));
        }
        let server = url.trim_end_matches('/').to_string();
        Ok(Self {
            client: json_client(SERVICE, HeaderMap::new(), timeout)?,
            base_url: database_url(&server, DEFAULT_TENANT, DEFAULT_DATABASE),
            server,
            ids: RwLock::new(HashMap::new()),
        })
    }

    /// Work inside `tenant` / `database` instead of the defaults.
    pub fn in_database(mut self, tenant: &str, database: &str) -> Self {
        self.base_url = database_url(&self.server, tenant, database);
        self.ids.write().clear();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("failed to parse Chroma response: {}", e)))
    }

    async fn create(&self, name: &str, get_or_create: bool) -> Result<ChromaCollection> {
        let body = json!({
            "name": name,
            "metadata": { SPACE_KEY: "cosine" },
            "get_or_create": get_or_create,
        });
        let collection: ChromaCollection = self
            .send(self.client.post(self.url("collections")).json(&body))
            .await?;
        let space = collection.space();
        if space != "cosine" {
            return Err(AppError::VectorStore(format!(
                "Chroma collection '{}' uses the '{}' space; docqa needs 'cosine'",
                name, space
            )));
        }
        self.ids
            .write()
            .insert(name.to_string(), collection.id.clone());
        debug!(collection = name, id = %collection.id, "resolved Chroma collection");
        Ok(collection)
    }

    async fn fetch(&self, name: &str) -> Result<ChromaCollection> {
        self.send(self.client.get(self.url(&format!("collections/{}", name))))
            .await
            .map_err(|e| match e {
                AppError::Upstream { status: 404, .. } => {
                    AppError::NotFound(format!("Collection '{}' not found", name))
                }
                other => other,
            })
    }

    /// Chroma id for a collection name, looked up once and cached.
    async fn collection_id(&self, name: &str) -> Result<String> {
        let cached = self.ids.read().get(name).cloned();
        if let Some(id) = cached {
            return Ok(id);
        }
        let collection = self.fetch(name).await?;
        self.ids
            .write()
            .insert(name.to_string(), collection.id.clone());
        Ok(collection.id)
    }

    async fn count_by_id(&self, id: &str) -> Result<usize> {
        self.send(self.client.get(self.url(&format!("collections/{}/count", id))))
            .await
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    fn provider_name(&self) -> &'static str {
        "chroma"
    }

    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        // Chroma infers dimensions from the first add.
        self.create(name, false).await.map(|_| ())
    }

    async fn get_or_create_collection(&self, name: &str) -> Result<()> {
        self.create(name, true).await.map(|_| ())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("collections/{}", name)))
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;
        check_status(SERVICE, response).await?;
        self.ids.write().remove(name);
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let collections: Vec<ChromaCollection> =
            self.send(self.client.get(self.url("collections"))).await?;
        let mut infos = Vec::with_capacity(collections.len());
        for collection in collections {
            let document_count = self.count_by_id(&collection.id).await?;
            infos.push(CollectionInfo {
                name: collection.name,
                document_count,
                dimensions: collection.dimension.unwrap_or(0),
            });
        }
        Ok(infos)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        match self.fetch(name).await {
            Ok(_) => Ok(true),
            Err(AppError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn collection_stats(&self, name: &str) -> Result<CollectionStats> {
        let collection = self.fetch(name).await?;
        let document_count = self.count_by_id(&collection.id).await?;
        let distance_metric = collection.space().to_string();
        Ok(CollectionStats {
            name: name.to_string(),
            document_count,
            dimensions: collection.dimension.unwrap_or(0),
            distance_metric,
        })
    }

    async fn upsert(&self, collection: &str, documents: &[Document]) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        let mut request = UpsertRequest {
            ids: Vec::with_capacity(documents.len()),
            embeddings: Vec::with_capacity(documents.len()),
            documents: Vec::with_capacity(documents.len()),
        };
        for doc in documents {
            let embedding = doc.embedding.as_deref().ok_or_else(|| {
                AppError::InvalidInput(format!("Document '{}' is missing embedding", doc.id))
            })?;
            request.ids.push(&doc.id);
            request.embeddings.push(embedding);
            request.documents.push(&doc.content);
        }

        let id = self.collection_id(collection).await?;
        let response = self
            .client
            .post(self.url(&format!("collections/{}/upsert", id)))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;
        check_status(SERVICE, response).await?;
        debug!(collection, count = documents.len(), "upserted into Chroma");
        Ok(documents.len())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        let id = self.collection_id(collection).await?;
        let body = json!({
            "query_embeddings": [embedding],
            "n_results": limit,
            "include": ["documents", "distances"],
        });
        let response: QueryResponse = self
            .send(
                self.client
                    .post(self.url(&format!("collections/{}/query", id)))
                    .json(&body),
            )
            .await?;
        Ok(response.into_results(threshold))
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let id = self.collection_id(collection).await?;
        let before = self.count_by_id(&id).await?;
        let response = self
            .client
            .post(self.url(&format!("collections/{}/delete", id)))
            .json(&json!({ "ids": ids }))
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;
        check_status(SERVICE, response).await?;
        let after = self.count_by_id(&id).await?;
        Ok(before.saturating_sub(after))
    }

    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Document>> {
        let id = self.collection_id(collection).await?;
        let body = json!({
            "ids": [doc_id],
            "include": ["documents", "embeddings"],
        });
        let response: GetResponse = self
            .send(
                self.client
                    .post(self.url(&format!("collections/{}/get", id)))
                    .json(&body),
            )
            .await?;
        Ok(response.into_documents().into_iter().next())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let id = self.collection_id(collection).await?;
        self.count_by_id(&id).await
    }
}

fn database_url(server: &str, tenant: &str, database: &str) -> String {
    format!(
        "{}/api/v2/tenants/{}/databases/{}",
        server, tenant, database
    )
}

#[derive(Debug, Deserialize)]
struct ChromaCollection {
    id: String,
    name: String,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    configuration_json: Option<serde_json::Value>,
    #[serde(default)]
    dimension: Option<usize>,
}

impl ChromaCollection {
    /// Distance space from the legacy metadata key or the index
    /// configuration; Chroma's own default is `l2`.
    fn space(&self) -> &str {
        let from_metadata = self
            .metadata
            .as_ref()
            .and_then(|m| m.get(SPACE_KEY))
            .and_then(|v| v.as_str());
        let from_configuration = || {
            let config = self.configuration_json.as_ref()?;
            ["hnsw", "spann"]
                .iter()
                .find_map(|index| config.get(index)?.get("space")?.as_str())
        };
        from_metadata.or_else(from_configuration).unwrap_or("l2")
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<&'a [f32]>,
    documents: Vec<&'a str>,
}

/// Query results are nested one level per query embedding; we always send one.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

impl QueryResponse {
    fn into_results(self, threshold: f32) -> Vec<SearchResult> {
        let ids = self.ids.into_iter().next().unwrap_or_default();
        let documents = self
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        let distances = self
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();

        ids.into_iter()
            .enumerate()
            .map(|(i, id)| {
                let content = documents.get(i).cloned().flatten().unwrap_or_default();
                let distance = distances.get(i).copied().unwrap_or(0.0);
                SearchResult {
                    document: Document::new(id, content),
                    score: 1.0 - distance,
                }
            })
            .filter(|r| r.score >= threshold)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    ids: Vec<String>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    embeddings: Option<Vec<Vec<f32>>>,
}

impl GetResponse {
    fn into_documents(self) -> Vec<Document> {
        let documents = self.documents.unwrap_or_default();
        let mut embeddings = self.embeddings.unwrap_or_default().into_iter();
        self.ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| Document {
                content: documents.get(i).cloned().flatten().unwrap_or_default(),
                embedding: embeddings.next(),
                id,
            })
            .collect()
    }
}
