//! Core module - Fundamental traits and types for the coordinator
//!
//! This module defines the abstractions that keep the coordinator decoupled
//! from concrete backends:
//! - Data model for requests, hits, merged results and metrics
//! - Storage traits for the memory store, vector index and embedder
//! - The adapter capability the coordinator fans queries out to

pub mod adapter;
pub mod storage;
pub mod types;

// Re-export core traits for convenient access
pub use adapter::{AdapterOutput, SearchAdapter, UnavailableAdapter};
pub use storage::{Embedder, MemoryBackend, MemoryRecord, VectorBackend, VectorRecord};
pub use types::*;
