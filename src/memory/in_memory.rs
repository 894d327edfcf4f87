//! In-process memory store
//!
//! Non-persistent `MemoryBackend` for local use and tests. Relevance is the
//! fraction of query terms found in a memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tokio::sync::RwLock;

use crate::core::{matches_filters, MemoryBackend, MemoryRecord, Metadata};
use crate::error::Result;

#[derive(Debug, Clone)]
struct StoredMemory {
    user_id: String,
    text: String,
    metadata: Metadata,
    created_at: DateTime<Utc>,
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '$')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Memory store held entirely in process
#[derive(Default)]
pub struct InMemoryStore {
    memories: RwLock<Vec<StoredMemory>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored memories across all users
    pub async fn len(&self) -> usize {
        self.memories.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.memories.read().await.is_empty()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryStore {
    fn id(&self) -> &str {
        "in_memory"
    }

    async fn add(&self, text: &str, user_id: &str, metadata: &Metadata) -> Result<()> {
        self.memories.write().await.push(StoredMemory {
            user_id: user_id.to_string(),
            text: text.to_string(),
            metadata: metadata.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        user_id: &str,
        limit: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<MemoryRecord>> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(vec![]);
        }

        let memories = self.memories.read().await;
        let mut records: Vec<MemoryRecord> = memories
            .iter()
            .filter(|m| m.user_id == user_id && matches_filters(filters, &m.metadata))
            .filter_map(|m| {
                let matched = terms(&m.text).intersection(&query_terms).count();
                if matched == 0 {
                    return None;
                }
                Some(MemoryRecord {
                    text: m.text.clone(),
                    score: matched as f32 / query_terms.len() as f32,
                    timestamp: Some(m.created_at),
                    metadata: m.metadata.clone(),
                })
            })
            .collect();

        records.sort_by(|a, b| b.score.total_cmp(&a.score).then(b.timestamp.cmp(&a.timestamp)));
        records.truncate(limit);
        Ok(records)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_search_scores_by_term_overlap() {
        let store = InMemoryStore::new();
        store.add("deadline is March 1", "alice", &Metadata::new()).await.unwrap();
        store.add("the budget is $500", "alice", &Metadata::new()).await.unwrap();
        store.add("deadline moved", "bob", &Metadata::new()).await.unwrap();

        let results = store.search("project deadline", "alice", 10, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "deadline is March 1");
        assert!((results[0].score - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_is_scoped_to_user() {
        let store = InMemoryStore::new();
        store.add("deadline moved", "bob", &Metadata::new()).await.unwrap();

        assert!(store.search("deadline", "alice", 10, None).await.unwrap().is_empty());
        assert_eq!(store.search("deadline", "bob", 10, None).await.unwrap().len(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_search_respects_limit_and_filters() {
        let store = InMemoryStore::new();
        let mut work = Metadata::new();
        work.insert("topic".into(), json!("work"));

        store.add("budget review", "alice", &work).await.unwrap();
        store.add("budget for groceries", "alice", &Metadata::new()).await.unwrap();
        store.add("budget spreadsheet", "alice", &work).await.unwrap();

        let limited = store.search("budget", "alice", 2, None).await.unwrap();
        assert_eq!(limited.len(), 2);

        let mut filters = Metadata::new();
        filters.insert("topic".into(), json!("work"));
        let filtered = store.search("budget", "alice", 10, Some(&filters)).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.metadata.get("topic") == Some(&json!("work"))));
    }

    #[tokio::test]
    async fn test_empty_query_terms() {
        let store = InMemoryStore::new();
        store.add("anything", "alice", &Metadata::new()).await.unwrap();
        assert!(store.search("  ...  ", "alice", 10, None).await.unwrap().is_empty());
    }
}
