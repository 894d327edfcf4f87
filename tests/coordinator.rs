//! End-to-end coordinator tests over the in-process backends

use async_trait::async_trait;
use recall_coordinator::config::CoordinatorConfig;
use recall_coordinator::core::{Embedder, Metadata, SearchAdapter, Subsystem};
use recall_coordinator::memory::{EmbeddingCache, InMemoryStore, LocalVectorIndex};
use recall_coordinator::retrieval::{MemoryAdapter, VectorAdapter};
use recall_coordinator::{Coordinator, QueryRequest, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

const DIMS: usize = 32;

/// Bag-of-words embedder: each lowercase word lands in a fixed bucket
struct BagOfWords;

#[async_trait]
impl Embedder for BagOfWords {
    fn id(&self) -> &str {
        "bag-of-words"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; DIMS];
        for word in text.split_whitespace() {
            let word = word.to_lowercase();
            let bucket = word.bytes().map(usize::from).sum::<usize>() % DIMS;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }
}

async fn build(dir: &Path) -> Coordinator {
    let index = LocalVectorIndex::open(dir, "notes").await.unwrap();

    let memory: Arc<dyn SearchAdapter> = Arc::new(MemoryAdapter::new(Arc::new(InMemoryStore::new())));
    let vector: Arc<dyn SearchAdapter> = Arc::new(
        VectorAdapter::new(Arc::new(BagOfWords), Arc::new(index)).with_cache(EmbeddingCache::default()),
    );

    Coordinator::new(CoordinatorConfig::default(), memory, vector).unwrap()
}

async fn seed(coordinator: &Coordinator) {
    for (text, user) in [
        ("deadline is March 1", "alice"),
        ("budget is $500", "alice"),
        ("standup moved to 10am", "alice"),
        ("deadline slipped to April", "bob"),
    ] {
        let report = coordinator.remember(text, user, Metadata::new()).await.unwrap();
        assert!(report.memory_stored && report.vector_stored, "{:?}", report.errors);
    }
}

#[tokio::test]
async fn test_query_merges_both_backends() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = build(dir.path()).await;
    seed(&coordinator).await;

    let response = coordinator
        .query(&QueryRequest::new("deadline is March 1", "alice").with_filter("user_id", "alice"))
        .await
        .unwrap();

    assert!(!response.is_degraded());
    assert!(!response.raw_memory_results.is_empty());
    assert!(!response.raw_vector_results.is_empty());
    assert!(
        response.merged_results.len()
            <= response.raw_memory_results.len() + response.raw_vector_results.len()
    );

    let texts: HashSet<_> = response.merged_results.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts.len(), response.merged_results.len());
    assert!(response
        .merged_results
        .windows(2)
        .all(|w| w[0].relevance >= w[1].relevance));
    assert!(response
        .merged_results
        .iter()
        .all(|r| (0.0..=1.0).contains(&r.relevance)));

    let deadline = response
        .merged_results
        .iter()
        .find(|r| r.text == "deadline is March 1")
        .unwrap();
    let sources: HashSet<_> = deadline.sources().into_iter().collect();
    assert_eq!(sources, HashSet::from([Subsystem::Memory, Subsystem::Vector]));
    assert_eq!(response.merged_results[0].text, "deadline is March 1");

    // bob's entry is filtered out of both backends
    assert!(!texts.contains("deadline slipped to April"));

    coordinator.close().await.unwrap();
}

#[tokio::test]
async fn test_vector_index_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let coordinator = build(dir.path()).await;
    seed(&coordinator).await;
    coordinator.close().await.unwrap();
    drop(coordinator);

    let reopened = LocalVectorIndex::open(dir.path(), "notes").await.unwrap();
    assert_eq!(reopened.len().await, 4);

    let coordinator = build(dir.path()).await;
    let response = coordinator
        .query(&QueryRequest::new("budget", "alice"))
        .await
        .unwrap();

    // memory store is in-process and starts empty again
    assert!(response.raw_memory_results.is_empty());
    assert!(!response.subsystem_metrics.memory.failed);
    assert!(response
        .merged_results
        .iter()
        .all(|r| r.source == Subsystem::Vector));
    assert_eq!(response.merged_results[0].text, "budget is $500");
}

#[tokio::test]
async fn test_concurrent_queries_share_coordinator() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = build(dir.path()).await;
    seed(&coordinator).await;

    let mut handles = Vec::new();
    for query in ["deadline", "budget", "standup", "deadline March"] {
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator
                .query(&QueryRequest::new(query, "alice").with_limit(2))
                .await
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert!(response.merged_results.len() <= 2);
        assert!(!response.is_degraded());
    }
}
