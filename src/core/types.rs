//! Core types used across the coordinator
//!
//! Requests, per-subsystem hits, merged results and the composite response.
//! Everything here is created fresh for a single query and dropped once the
//! response has been handed back to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Error;

/// Open metadata map attached to hits and results
pub type Metadata = HashMap<String, serde_json::Value>;

/// Retrieval subsystem a hit originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    /// Conversational/episodic memory store
    Memory,
    /// Vector similarity index
    Vector,
}

impl Subsystem {
    /// Both subsystems, in default priority order
    pub const ALL: [Subsystem; 2] = [Subsystem::Memory, Subsystem::Vector];
}

impl std::fmt::Display for Subsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subsystem::Memory => write!(f, "memory"),
            Subsystem::Vector => write!(f, "vector"),
        }
    }
}

impl std::str::FromStr for Subsystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Subsystem::Memory),
            "vector" => Ok(Subsystem::Vector),
            other => Err(Error::Config(format!("Unknown subsystem: {}", other))),
        }
    }
}

/// A retrieval query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Query text (must be non-empty)
    pub query: String,
    /// User/tenant the query runs on behalf of
    #[serde(default)]
    pub user_id: String,
    /// Maximum number of merged results; configured default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Metadata equality filter applied by each backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Metadata>,
}

impl QueryRequest {
    /// Create a new request with no explicit limit or filters
    pub fn new(query: impl Into<String>, user_id: impl Into<String>) -> Self {
        QueryRequest {
            query: query.into(),
            user_id: user_id.into(),
            limit: None,
            filters: None,
        }
    }

    /// Set the result limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add a metadata equality filter
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.filters
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }

    /// Check whether a metadata map satisfies this request's filters
    pub fn matches_filters(&self, metadata: &Metadata) -> bool {
        matches_filters(self.filters.as_ref(), metadata)
    }
}

/// Check that every filter key is present in `metadata` with an equal value
pub fn matches_filters(filters: Option<&Metadata>, metadata: &Metadata) -> bool {
    filters.map_or(true, |filters| {
        filters
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected))
    })
}

/// A subsystem-native score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum NativeScore {
    /// Higher is better; range depends on the backend
    Relevance(f32),
    /// Lower is better; typically 0..2 for cosine distance
    Distance(f32),
}

/// A hit exactly as a subsystem returned it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    /// Text content
    pub text: String,
    /// Native score
    pub score: NativeScore,
    /// When the underlying record was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Backend-specific metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl RawHit {
    /// Create a hit carrying a relevance score
    pub fn with_relevance(text: impl Into<String>, relevance: f32) -> Self {
        RawHit {
            text: text.into(),
            score: NativeScore::Relevance(relevance),
            timestamp: None,
            metadata: Metadata::new(),
        }
    }

    /// Create a hit carrying a distance score
    pub fn with_distance(text: impl Into<String>, distance: f32) -> Self {
        RawHit {
            text: text.into(),
            score: NativeScore::Distance(distance),
            timestamp: None,
            metadata: Metadata::new(),
        }
    }

    /// Set the timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Add a metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Text used as the deduplication key
    pub fn dedup_key(&self) -> &str {
        self.text.trim()
    }
}

/// A raw hit with its score mapped onto the common relevance scale
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedHit {
    /// The original hit
    pub hit: RawHit,
    /// Relevance in [0, 1], higher is better
    pub relevance: f32,
    /// Subsystem that produced the hit
    pub source: Subsystem,
}

/// One contributor to a merged result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    /// Contributing subsystem
    pub source: Subsystem,
    /// Score as the subsystem reported it
    pub native_score: NativeScore,
    /// Score after normalization
    pub relevance: f32,
    /// The contributor's own metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: Metadata,
}

/// A deduplicated, ranked result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedResult {
    /// Trimmed text content
    pub text: String,
    /// Relevance of the winning duplicate
    pub relevance: f32,
    /// Subsystem of the winning duplicate
    pub source: Subsystem,
    /// Timestamp of the winning duplicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Union of contributor metadata; winner values take precedence
    #[serde(default)]
    pub metadata: Metadata,
    /// Every contributor, winner first
    pub provenance: Vec<ProvenanceEntry>,
}

impl MergedResult {
    /// Subsystems that contributed to this result
    pub fn sources(&self) -> Vec<Subsystem> {
        self.provenance.iter().map(|p| p.source).collect()
    }
}

/// Timing and cost for one subsystem call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemMetrics {
    /// Wall-clock time spent in the subsystem, in seconds
    pub time_sec: f64,
    /// Monetary cost reported by the adapter
    pub cost: f64,
    /// Whether the subsystem failed, timed out, or is not configured
    pub failed: bool,
    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of raw hits returned
    #[serde(default)]
    pub hits: usize,
}

impl SubsystemMetrics {
    /// Metrics for a successful call
    pub fn succeeded(elapsed: Duration, cost: f64, hits: usize) -> Self {
        SubsystemMetrics {
            time_sec: elapsed.as_secs_f64(),
            cost,
            failed: false,
            error: None,
            hits,
        }
    }

    /// Metrics for a failed call
    pub fn failed(elapsed: Duration, error: &Error) -> Self {
        SubsystemMetrics {
            time_sec: elapsed.as_secs_f64(),
            cost: 0.0,
            failed: true,
            error: Some(error.to_string()),
            hits: 0,
        }
    }
}

/// Metrics for both subsystems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemMetricsReport {
    /// Memory store metrics
    pub memory: SubsystemMetrics,
    /// Vector index metrics
    pub vector: SubsystemMetrics,
}

impl SubsystemMetricsReport {
    /// Total cost across subsystems
    pub fn total_cost(&self) -> f64 {
        self.memory.cost + self.vector.cost
    }
}

/// Composite response for one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorResponse {
    /// Deduplicated results, relevance descending
    pub merged_results: Vec<MergedResult>,
    /// Per-subsystem timing, cost and failure flags
    pub subsystem_metrics: SubsystemMetricsReport,
    /// Hits exactly as the memory store returned them
    pub raw_memory_results: Vec<RawHit>,
    /// Hits exactly as the vector index returned them
    pub raw_vector_results: Vec<RawHit>,
}

impl CoordinatorResponse {
    /// True when neither subsystem could be searched
    pub fn is_total_failure(&self) -> bool {
        self.subsystem_metrics.memory.failed && self.subsystem_metrics.vector.failed
    }

    /// True when at least one subsystem failed
    pub fn is_degraded(&self) -> bool {
        self.subsystem_metrics.memory.failed || self.subsystem_metrics.vector.failed
    }
}
