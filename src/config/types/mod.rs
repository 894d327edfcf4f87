//! Configuration types module
//!
//! Top-level coordinator configuration plus the retrieval and merge policy
//! sections. Backend connection settings live in `storage`.

pub mod storage;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::Subsystem;

/// Main coordinator configuration
///
/// Every section has defaults and unknown keys are ignored, so a partial file
/// only needs to name what it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Query defaults, per-subsystem caps and timeouts
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Deduplication and ranking policy
    #[serde(default)]
    pub merge: MergeConfig,

    /// Episodic memory store
    #[serde(default)]
    pub memory: storage::MemoryStoreConfig,

    /// Vector similarity index
    #[serde(default)]
    pub vector: storage::VectorIndexConfig,
}

impl CoordinatorConfig {
    /// Load configuration from the config file and environment
    ///
    /// Layering: defaults < config file < environment variables.
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Limit applied when a request does not set one
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Maximum hits requested from each subsystem before merging
    #[serde(default = "default_max_results")]
    pub max_results_per_subsystem: usize,
    /// Memory store call timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub memory_timeout: Duration,
    /// Vector index call timeout (embedding included)
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub vector_timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        RetrievalConfig {
            default_limit: default_limit(),
            max_results_per_subsystem: default_max_results(),
            memory_timeout: default_timeout(),
            vector_timeout: default_timeout(),
        }
    }
}

impl RetrievalConfig {
    /// Timeout for one subsystem
    pub fn timeout_for(&self, subsystem: Subsystem) -> Duration {
        match subsystem {
            Subsystem::Memory => self.memory_timeout,
            Subsystem::Vector => self.vector_timeout,
        }
    }
}

fn default_limit() -> usize {
    5
}

fn default_max_results() -> usize {
    10
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Merge policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Subsystem that wins ties after relevance and recency
    #[serde(default = "default_prefer")]
    pub prefer: Subsystem,
    /// Memory scores with a magnitude above this trigger batch rescaling
    #[serde(default = "default_rescale_threshold")]
    pub memory_rescale_threshold: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            prefer: default_prefer(),
            memory_rescale_threshold: default_rescale_threshold(),
        }
    }
}

impl MergeConfig {
    /// Rank of a subsystem in the tie-break order (lower wins)
    pub fn priority_rank(&self, subsystem: Subsystem) -> u8 {
        if subsystem == self.prefer {
            0
        } else {
            1
        }
    }
}

fn default_prefer() -> Subsystem {
    Subsystem::Memory
}

fn default_rescale_threshold() -> f32 {
    1.0
}
