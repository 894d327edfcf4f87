//! Subsystem adapters
//!
//! Translate between the coordinator's request/hit shapes and the backend
//! collaborator traits, and classify every backend failure as a subsystem
//! failure the coordinator can absorb.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::core::{
    AdapterOutput, Embedder, MemoryBackend, Metadata, NativeScore, QueryRequest, RawHit,
    SearchAdapter, Subsystem, VectorBackend,
};
use crate::error::{Error, Result};
use crate::memory::EmbeddingCache;

/// Re-tag any backend error as `SubsystemUnavailable`, keeping embedding
/// errors as they are
fn classify(subsystem: Subsystem, err: Error) -> Error {
    match err {
        Error::SubsystemUnavailable { .. } | Error::Embedding(_) => err,
        other => Error::unavailable(subsystem, other.to_string()),
    }
}

/// Adapter over an episodic memory store
pub struct MemoryAdapter {
    backend: Arc<dyn MemoryBackend>,
    cost_per_query: f64,
}

impl MemoryAdapter {
    /// Create an adapter over a memory backend
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        MemoryAdapter {
            backend,
            cost_per_query: 0.0,
        }
    }

    /// Set the cost reported for each search
    pub fn with_cost(mut self, cost_per_query: f64) -> Self {
        self.cost_per_query = cost_per_query;
        self
    }
}

#[async_trait]
impl SearchAdapter for MemoryAdapter {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Memory
    }

    fn backend_id(&self) -> &str {
        self.backend.id()
    }

    async fn search(&self, request: &QueryRequest, limit: usize) -> Result<AdapterOutput> {
        let records = self
            .backend
            .search(
                &request.query,
                &request.user_id,
                limit,
                request.filters.as_ref(),
            )
            .await
            .map_err(|e| classify(Subsystem::Memory, e))?;

        let hits = records
            .into_iter()
            .map(|r| RawHit {
                text: r.text,
                score: NativeScore::Relevance(r.score),
                timestamp: r.timestamp,
                metadata: r.metadata,
            })
            .collect();

        Ok(AdapterOutput::new(hits).with_cost(self.cost_per_query))
    }

    async fn ingest(&self, text: &str, user_id: &str, metadata: &Metadata) -> Result<()> {
        self.backend
            .add(text, user_id, metadata)
            .await
            .map_err(|e| classify(Subsystem::Memory, e))
    }

    async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }

    async fn close(&self) -> Result<()> {
        self.backend.close().await
    }
}

/// Adapter over an embedder plus a vector index
pub struct VectorAdapter {
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn VectorBackend>,
    cache: Option<EmbeddingCache>,
    cost_per_query: f64,
}

impl VectorAdapter {
    /// Create an adapter with no embedding cache
    pub fn new(embedder: Arc<dyn Embedder>, backend: Arc<dyn VectorBackend>) -> Self {
        VectorAdapter {
            embedder,
            backend,
            cache: None,
            cost_per_query: 0.0,
        }
    }

    /// Cache query embeddings
    pub fn with_cache(mut self, cache: EmbeddingCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the cost reported for each search
    pub fn with_cost(mut self, cost_per_query: f64) -> Self {
        self.cost_per_query = cost_per_query;
        self
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text).await.map_err(|e| match e {
            Error::Embedding(_) => e,
            other => Error::Embedding(other.to_string()),
        })
    }

    /// Get or create the query embedding (using cache)
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(text).await {
                debug!("Query embedding cache hit");
                return Ok(cached);
            }
        }

        let embedding = self.embed(text).await?;
        if let Some(cache) = &self.cache {
            cache.put(text, embedding.clone()).await;
        }
        Ok(embedding)
    }
}

#[async_trait]
impl SearchAdapter for VectorAdapter {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Vector
    }

    fn backend_id(&self) -> &str {
        self.backend.id()
    }

    async fn search(&self, request: &QueryRequest, limit: usize) -> Result<AdapterOutput> {
        let embedding = self.embed_query(&request.query).await?;

        let records = self
            .backend
            .query(&embedding, limit, request.filters.as_ref())
            .await
            .map_err(|e| classify(Subsystem::Vector, e))?;

        let hits = records
            .into_iter()
            .map(|r| RawHit {
                text: r.text,
                score: NativeScore::Distance(r.distance),
                timestamp: r.timestamp,
                metadata: r.metadata,
            })
            .collect();

        Ok(AdapterOutput::new(hits).with_cost(self.cost_per_query))
    }

    async fn ingest(&self, text: &str, _user_id: &str, metadata: &Metadata) -> Result<()> {
        let embedding = self.embed(text).await?;
        self.backend
            .add(text, embedding, metadata)
            .await
            .map_err(|e| classify(Subsystem::Vector, e))
    }

    async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }

    async fn close(&self) -> Result<()> {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
        self.backend.close().await
    }
}
