//! Storage traits - Abstract interfaces for the external backends
//!
//! The coordinator never talks to a database or model directly. It goes
//! through these collaborator traits:
//! - `MemoryBackend`: episodic memory keyed by user, text search with relevance scores
//! - `VectorBackend`: similarity search over embeddings, distance scores
//! - `Embedder`: text to vector
//!
//! Concrete implementations live in `database` (PostgreSQL) and `memory`
//! (in-process and file-backed).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::Metadata;
use crate::error::Result;

/// A record returned by a memory backend search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Stored text
    pub text: String,
    /// Backend relevance score (higher is better, range unspecified)
    pub score: f32,
    /// When the memory was stored
    pub timestamp: Option<DateTime<Utc>>,
    /// Stored metadata
    pub metadata: Metadata,
}

/// A record returned by a vector backend query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Stored text
    pub text: String,
    /// Distance to the query vector (lower is more similar)
    pub distance: f32,
    /// When the document was indexed
    pub timestamp: Option<DateTime<Utc>>,
    /// Stored metadata
    pub metadata: Metadata,
}

/// Abstract interface for an episodic memory store
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Get the backend ID
    fn id(&self) -> &str;

    /// Store a memory for a user
    async fn add(&self, text: &str, user_id: &str, metadata: &Metadata) -> Result<()>;

    /// Search a user's memories
    async fn search(
        &self,
        query: &str,
        user_id: &str,
        limit: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<MemoryRecord>>;

    /// Health check
    async fn health_check(&self) -> Result<bool>;

    /// Release connections
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Abstract interface for a vector similarity index
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Get the backend ID
    fn id(&self) -> &str;

    /// Index a document with its embedding
    async fn add(&self, text: &str, embedding: Vec<f32>, metadata: &Metadata) -> Result<()>;

    /// Return the `n_results` nearest documents
    async fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<VectorRecord>>;

    /// Health check
    async fn health_check(&self) -> Result<bool>;

    /// Flush and release resources
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Abstract interface for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Get the embedder ID
    fn id(&self) -> &str;

    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
