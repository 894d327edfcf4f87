//! File-backed vector index
//!
//! One JSON file per collection under the persistence directory. Search is
//! brute force over every document using cosine distance (0 = identical,
//! 2 = opposite), which is plenty for personal-scale collections.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ensure_dir;
use crate::core::{matches_filters, Metadata, VectorBackend, VectorRecord};
use crate::error::{Error, Result};

/// A document stored in the local index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Document ID
    pub id: Uuid,
    /// Document text
    pub text: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Document metadata
    #[serde(default)]
    pub metadata: Metadata,
    /// When the document was indexed
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    collection: &'a str,
    documents: &'a [IndexedDocument],
}

#[derive(Deserialize)]
struct IndexFile {
    #[serde(default)]
    documents: Vec<IndexedDocument>,
}

/// Cosine distance between two vectors of equal length
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    (1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0)
}

/// Vector index persisted as `<persist_dir>/<collection>.json`
pub struct LocalVectorIndex {
    collection: String,
    path: PathBuf,
    documents: RwLock<Vec<IndexedDocument>>,
}

impl LocalVectorIndex {
    /// Open (or create) the index file for a collection
    pub async fn open(persist_dir: &Path, collection: &str) -> Result<Self> {
        ensure_dir(persist_dir)?;
        let path = persist_dir.join(format!("{}.json", collection));

        let documents = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<IndexFile>(&bytes)?.documents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "Opened local vector index {} with {} documents",
            path.display(),
            documents.len()
        );

        Ok(LocalVectorIndex {
            collection: collection.to_string(),
            path,
            documents: RwLock::new(documents),
        })
    }

    /// Path of the index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of indexed documents
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Check if the index is empty
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Write the documents to disk via a temp file and rename
    async fn persist(&self, documents: &[IndexedDocument]) -> Result<()> {
        let bytes = serde_json::to_vec(&IndexFileRef {
            collection: &self.collection,
            documents,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("Persisted {} documents to {}", documents.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl VectorBackend for LocalVectorIndex {
    fn id(&self) -> &str {
        "local"
    }

    async fn add(&self, text: &str, embedding: Vec<f32>, metadata: &Metadata) -> Result<()> {
        let mut documents = self.documents.write().await;

        if let Some(first) = documents.first() {
            if first.embedding.len() != embedding.len() {
                return Err(Error::InvalidRequest(format!(
                    "Embedding dimension mismatch: index has {}, got {}",
                    first.embedding.len(),
                    embedding.len()
                )));
            }
        }

        documents.push(IndexedDocument {
            id: Uuid::new_v4(),
            text: text.to_string(),
            embedding,
            metadata: metadata.clone(),
            created_at: Utc::now(),
        });

        // The in-memory view only keeps what reached disk
        if let Err(e) = self.persist(&documents).await {
            documents.pop();
            return Err(e);
        }
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<VectorRecord>> {
        let documents = self.documents.read().await;

        let mut scored: Vec<(f32, &IndexedDocument)> = Vec::new();
        for doc in documents.iter() {
            if doc.embedding.len() != embedding.len() {
                warn!(
                    "Skipping document {} with dimension {} (query has {})",
                    doc.id,
                    doc.embedding.len(),
                    embedding.len()
                );
                continue;
            }
            if !matches_filters(filters, &doc.metadata) {
                continue;
            }
            scored.push((cosine_distance(embedding, &doc.embedding), doc));
        }

        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(n_results);

        Ok(scored
            .into_iter()
            .map(|(distance, doc)| VectorRecord {
                text: doc.text.clone(),
                distance,
                timestamp: Some(doc.created_at),
                metadata: doc.metadata.clone(),
            })
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.path.parent().map_or(true, |dir| dir.is_dir()))
    }

    async fn close(&self) -> Result<()> {
        let documents = self.documents.read().await;
        self.persist(&documents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalVectorIndex::open(dir.path(), "notes").await.unwrap();
        assert!(index.is_empty().await);

        index.add("north", vec![0.0, 1.0], &Metadata::new()).await.unwrap();
        index.add("east", vec![1.0, 0.0], &Metadata::new()).await.unwrap();
        index.add("north-east", vec![1.0, 1.0], &Metadata::new()).await.unwrap();

        let results = index.query(&[1.0, 0.1], 2, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "east");
        assert_eq!(results[1].text, "north-east");
        assert!(results[0].distance <= results[1].distance);
        assert!(results[0].timestamp.is_some());
    }

    #[tokio::test]
    async fn test_query_applies_filters() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalVectorIndex::open(dir.path(), "notes").await.unwrap();

        let mut work = Metadata::new();
        work.insert("topic".into(), json!("work"));
        let mut home = Metadata::new();
        home.insert("topic".into(), json!("home"));

        index.add("budget is $500", vec![1.0, 0.0], &work).await.unwrap();
        index.add("buy milk", vec![1.0, 0.0], &home).await.unwrap();

        let mut filters = Metadata::new();
        filters.insert("topic".into(), json!("home"));

        let results = index.query(&[1.0, 0.0], 10, Some(&filters)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "buy milk");
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = LocalVectorIndex::open(dir.path(), "notes").await.unwrap();
            index.add("deadline is March 1", vec![0.5, 0.5], &Metadata::new()).await.unwrap();
            index.close().await.unwrap();
        }

        let reopened = LocalVectorIndex::open(dir.path(), "notes").await.unwrap();
        assert_eq!(reopened.len().await, 1);
        assert!(reopened.path().ends_with("notes.json"));

        // Collections are separate files
        let other = LocalVectorIndex::open(dir.path(), "other").await.unwrap();
        assert!(other.is_empty().await);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalVectorIndex::open(dir.path(), "notes").await.unwrap();

        index.add("a", vec![1.0, 0.0], &Metadata::new()).await.unwrap();
        let err = index.add("b", vec![1.0, 0.0, 0.0], &Metadata::new()).await;
        assert!(matches!(err, Err(Error::InvalidRequest(_))));
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_write_is_not_searchable() {
        let dir = tempfile::tempdir().unwrap();
        let persist_dir = dir.path().join("index");
        let index = LocalVectorIndex::open(&persist_dir, "notes").await.unwrap();
        index.add("kept", vec![1.0, 0.0], &Metadata::new()).await.unwrap();

        std::fs::remove_dir_all(&persist_dir).unwrap();

        let err = index.add("lost", vec![0.0, 1.0], &Metadata::new()).await;
        assert!(matches!(err, Err(Error::Io(_))));
        assert_eq!(index.len().await, 1);

        let results = index.query(&[0.0, 1.0], 10, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "kept");
    }
}
