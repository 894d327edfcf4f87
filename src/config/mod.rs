//! Configuration module - Modular configuration management
//!
//! - types/mod.rs: Coordinator, retrieval and merge configuration
//! - types/storage.rs: Memory store, vector index and embedding configuration
//! - io.rs: Configuration loading
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration and data paths

mod io;
mod paths;
mod types;
mod validation;

// Re-export core config types
pub use types::{CoordinatorConfig, MergeConfig, RetrievalConfig};

// Re-export storage types
pub use types::storage::{
    EmbeddingConfig, MemoryBackendType, MemoryStoreConfig, PostgresConfig, VectorBackendType,
    VectorIndexConfig,
};

// Re-export IO and utilities
pub use io::{apply_env_overrides, load_config, load_config_from_path, parse_config, SAMPLE_CONFIG};
pub use paths::{config_dir, config_path, default_persist_dir, ensure_dir, state_dir};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
