//! Storage configuration types
//!
//! Configuration for the memory store, the vector index and the embedding
//! model the vector path uses.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Memory store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Memory backend type
    #[serde(default)]
    pub backend: MemoryBackendType,
    /// PostgreSQL connection (required for the postgres backend)
    pub postgres: Option<PostgresConfig>,
    /// Cost charged per search, reported in metrics
    #[serde(default)]
    pub cost_per_query: f64,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        MemoryStoreConfig {
            backend: MemoryBackendType::default(),
            postgres: None,
            cost_per_query: 0.0,
        }
    }
}

/// Memory backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackendType {
    /// PostgreSQL full-text search
    Postgres,
    /// In-process store (no persistence)
    #[default]
    InMemory,
    /// Subsystem switched off
    Disabled,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Vector backend type
    #[serde(default)]
    pub backend: VectorBackendType,
    /// Collection (namespace) name
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Directory holding local index files
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,
    /// PostgreSQL connection (required for the postgres backend)
    pub postgres: Option<PostgresConfig>,
    /// Embedding model settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Cost charged per search (embedding included), reported in metrics
    #[serde(default)]
    pub cost_per_query: f64,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        VectorIndexConfig {
            backend: VectorBackendType::default(),
            collection: default_collection(),
            persist_dir: default_persist_dir(),
            postgres: None,
            embedding: EmbeddingConfig::default(),
            cost_per_query: 0.0,
        }
    }
}

fn default_collection() -> String {
    "recall".to_string()
}

fn default_persist_dir() -> PathBuf {
    crate::config::paths::default_persist_dir()
}

/// Vector backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackendType {
    /// JSON file per collection under `persist_dir`
    #[default]
    Local,
    /// PostgreSQL with pgvector
    Postgres,
    /// Subsystem switched off
    Disabled,
}

/// PostgreSQL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Database URL
    #[serde(skip_serializing)]
    pub url: SecretString,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl PostgresConfig {
    /// Connection settings for a URL with default pool options
    pub fn new(url: impl Into<String>) -> Self {
        PostgresConfig {
            url: SecretString::from(url.into()),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Show model download progress on first use
    #[serde(default)]
    pub show_download_progress: bool,
    /// Maximum cached query embeddings
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Cached embedding lifetime
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub cache_ttl: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            model: default_embedding_model(),
            show_download_progress: false,
            cache_capacity: default_cache_capacity(),
            cache_ttl: default_cache_ttl(),
        }
    }
}

fn default_embedding_model() -> String {
    "multilingual-e5-small".to_string()
}

fn default_cache_capacity() -> u64 {
    1000
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}
