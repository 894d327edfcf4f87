//! Memory module - local backends and embedding generation
//!
//! In-process building blocks that need no external services: fastembed
//! embeddings, a moka query-embedding cache, an in-memory episodic store and
//! a file-backed vector index.

pub mod cache;
pub mod embedding;
pub mod in_memory;
pub mod local_index;

pub use cache::EmbeddingCache;
pub use embedding::{EmbeddingService, EMBEDDING_DIMENSIONS};
pub use in_memory::InMemoryStore;
pub use local_index::LocalVectorIndex;
