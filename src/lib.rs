//! # Recall Coordinator
//!
//! Retrieval coordination for agents that keep both conversational memory and
//! a document index.
//!
//! ## Features
//!
//! - **Parallel Fan-out:** Memory store and vector index are queried concurrently with independent timeouts
//! - **Common Relevance Scale:** Distances and unbounded ranks normalized to [0, 1]
//! - **Deduplication with Provenance:** One result per text, every contributor recorded
//! - **Graceful Degradation:** Either subsystem may be down; failures show up in metrics, not errors
//! - **Pluggable Backends:** PostgreSQL full-text, pgvector, in-process store, file-backed index

pub mod config;
pub mod core;
pub mod database;
pub mod error;
pub mod memory;
pub mod retrieval;

pub use config::CoordinatorConfig;
pub use core::{CoordinatorResponse, MergedResult, QueryRequest, Subsystem};
pub use error::{Error, Result};
pub use retrieval::{Coordinator, RememberReport};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
