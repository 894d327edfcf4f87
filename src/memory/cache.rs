//! In-process caching for query embeddings
//!
//! Uses moka async cache (Send + Sync, TTL-based eviction).
//! No external services required.

use crate::config::EmbeddingConfig;
use moka::future::Cache;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Cache key helper: hash a string to u64
fn hash_key(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Query embedding cache: hash(text) -> Vec<f32>
#[derive(Clone)]
pub struct EmbeddingCache {
    embeddings: Cache<u64, Vec<f32>>,
}

impl EmbeddingCache {
    /// Create a cache sized by the embedding configuration
    pub fn new(config: &EmbeddingConfig) -> Self {
        EmbeddingCache {
            embeddings: Cache::builder()
                .max_capacity(config.cache_capacity)
                .time_to_live(config.cache_ttl)
                .build(),
        }
    }

    /// Get a cached embedding
    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.embeddings.get(&hash_key(text)).await
    }

    /// Store an embedding in cache
    pub async fn put(&self, text: &str, embedding: Vec<f32>) {
        self.embeddings.insert(hash_key(text), embedding).await;
    }

    /// Drop every cached embedding
    pub fn clear(&self) {
        self.embeddings.invalidate_all();
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new(&EmbeddingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embedding_cache() {
        let cache = EmbeddingCache::default();

        assert!(cache.get("hello").await.is_none());

        cache.put("hello", vec![0.1, 0.2, 0.3]).await;

        let result = cache.get("hello").await;
        assert!(result.is_some());
        assert_eq!(result.unwrap().len(), 3);
        assert!(cache.get("world").await.is_none());
    }
}
