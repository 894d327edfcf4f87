//! Retrieval module - fan-out, normalization and merging
//!
//! - `adapters`: memory store and vector index behind `SearchAdapter`
//! - `metrics`: timed, timeout-bounded subsystem calls
//! - `normalize`: native scores to relevance in [0, 1]
//! - `merge`: deduplication and ranking
//! - `coordinator`: the query entry point tying these together

pub mod adapters;
pub mod coordinator;
pub mod merge;
pub mod metrics;
pub mod normalize;

pub use adapters::{MemoryAdapter, VectorAdapter};
pub use coordinator::{Coordinator, RememberReport, SubsystemStatus};
pub use merge::{compare_hits, compare_results, merge_hits};
pub use metrics::{timed_search, SubsystemOutcome};
pub use normalize::{normalize_hits, normalize_memory_batch, normalize_memory_score, normalize_vector_score};
