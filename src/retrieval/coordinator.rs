//! Retrieval coordinator
//!
//! Single entry point for retrieval. Each query fans out to the memory store
//! and the vector index in parallel, waits for both (each under its own
//! timeout), then normalizes, deduplicates and ranks the combined hits.
//!
//! Subsystem failures never fail the query. They are recorded in that
//! subsystem's metrics and its hits are treated as empty. Only invalid
//! requests and configuration problems are returned as errors.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{validate_config, CoordinatorConfig, MemoryBackendType, VectorBackendType};
use crate::core::{
    CoordinatorResponse, Metadata, QueryRequest, SearchAdapter, Subsystem,
    SubsystemMetricsReport, UnavailableAdapter,
};
use crate::database::{init_pool, PgMemoryStore, PgVectorIndex};
use crate::error::{Error, Result};
use crate::memory::{EmbeddingCache, EmbeddingService, InMemoryStore, LocalVectorIndex};

use super::adapters::{MemoryAdapter, VectorAdapter};
use super::merge::merge_hits;
use super::metrics::{timed_search, SubsystemOutcome};
use super::normalize::normalize_hits;

/// Outcome of storing one entry in both subsystems
#[derive(Debug, Clone, Default, Serialize)]
pub struct RememberReport {
    /// Stored in the memory store
    pub memory_stored: bool,
    /// Stored in the vector index
    pub vector_stored: bool,
    /// Per-subsystem failure descriptions
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl RememberReport {
    /// True when at least one subsystem stored the entry
    pub fn stored_anywhere(&self) -> bool {
        self.memory_stored || self.vector_stored
    }
}

/// Availability of one subsystem
#[derive(Debug, Clone, Serialize)]
pub struct SubsystemStatus {
    /// Subsystem
    pub subsystem: Subsystem,
    /// Backend identifier
    pub backend: String,
    /// Whether a backend is wired up
    pub available: bool,
    /// Whether the backend answered its health check
    pub healthy: bool,
    /// Health check failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fans queries out to both retrieval subsystems and merges the results
#[derive(Clone)]
pub struct Coordinator {
    config: CoordinatorConfig,
    memory: Arc<dyn SearchAdapter>,
    vector: Arc<dyn SearchAdapter>,
}

impl Coordinator {
    /// Create a coordinator over already-built adapters
    pub fn new(
        config: CoordinatorConfig,
        memory: Arc<dyn SearchAdapter>,
        vector: Arc<dyn SearchAdapter>,
    ) -> Result<Self> {
        check_config(&config)?;

        if memory.subsystem() != Subsystem::Memory {
            return Err(Error::Config(format!(
                "Memory slot was given a {} adapter",
                memory.subsystem()
            )));
        }
        if vector.subsystem() != Subsystem::Vector {
            return Err(Error::Config(format!(
                "Vector slot was given a {} adapter",
                vector.subsystem()
            )));
        }

        info!(
            memory = memory.backend_id(),
            vector = vector.backend_id(),
            "Retrieval coordinator ready"
        );

        Ok(Coordinator {
            config,
            memory,
            vector,
        })
    }

    /// Build both adapters from configuration.
    ///
    /// A subsystem that is disabled or whose backend cannot be reached is
    /// replaced by an `UnavailableAdapter`; queries then run degraded.
    /// Invalid configuration fails here.
    pub async fn connect(config: CoordinatorConfig) -> Result<Self> {
        check_config(&config)?;

        let memory = build_memory_adapter(&config).await?;
        let vector = build_vector_adapter(&config).await?;

        Self::new(config, memory, vector)
    }

    /// Active configuration
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn adapter(&self, subsystem: Subsystem) -> &Arc<dyn SearchAdapter> {
        match subsystem {
            Subsystem::Memory => &self.memory,
            Subsystem::Vector => &self.vector,
        }
    }

    /// Validate a request and resolve its effective limit
    fn resolve_limit(&self, request: &QueryRequest) -> Result<usize> {
        if request.query.trim().is_empty() {
            return Err(Error::InvalidRequest("Query text must not be empty".into()));
        }

        match request.limit {
            None => Ok(self.config.retrieval.default_limit),
            Some(0) => Err(Error::InvalidRequest("Limit must be greater than 0".into())),
            Some(limit) => Ok(limit),
        }
    }

    /// Run a query against both subsystems and merge the results
    pub async fn query(&self, request: &QueryRequest) -> Result<CoordinatorResponse> {
        let limit = self.resolve_limit(request)?;
        let per_subsystem = limit.min(self.config.retrieval.max_results_per_subsystem);
        let shared = Arc::new(request.clone());

        debug!(
            user_id = %request.user_id,
            limit,
            per_subsystem,
            "Dispatching query to both subsystems"
        );

        let started = Instant::now();
        let memory_task = tokio::spawn(timed_search(
            Arc::clone(&self.memory),
            Arc::clone(&shared),
            per_subsystem,
            self.config.retrieval.timeout_for(Subsystem::Memory),
        ));
        let vector_task = tokio::spawn(timed_search(
            Arc::clone(&self.vector),
            Arc::clone(&shared),
            per_subsystem,
            self.config.retrieval.timeout_for(Subsystem::Vector),
        ));

        let (memory, vector) = tokio::join!(memory_task, vector_task);
        let memory = memory.unwrap_or_else(|e| {
            SubsystemOutcome::from_join_error(Subsystem::Memory, started.elapsed(), e)
        });
        let vector = vector.unwrap_or_else(|e| {
            SubsystemOutcome::from_join_error(Subsystem::Vector, started.elapsed(), e)
        });

        let threshold = self.config.merge.memory_rescale_threshold;
        let mut normalized = normalize_hits(&memory.hits, Subsystem::Memory, threshold);
        normalized.extend(normalize_hits(&vector.hits, Subsystem::Vector, threshold));

        let mut merged_results = merge_hits(normalized, &self.config.merge);
        merged_results.truncate(limit);

        let response = CoordinatorResponse {
            merged_results,
            subsystem_metrics: SubsystemMetricsReport {
                memory: memory.metrics,
                vector: vector.metrics,
            },
            raw_memory_results: memory.hits,
            raw_vector_results: vector.hits,
        };

        if response.is_total_failure() {
            warn!("Both retrieval subsystems failed; returning empty result set");
        }
        info!(
            results = response.merged_results.len(),
            memory_hits = response.raw_memory_results.len(),
            vector_hits = response.raw_vector_results.len(),
            degraded = response.is_degraded(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query completed"
        );

        Ok(response)
    }

    /// Store an entry in both subsystems.
    ///
    /// The user id is copied into the metadata so it can be used as a filter
    /// later, including on the vector index, which is not user-scoped.
    /// Subsystem failures are reported, not returned.
    pub async fn remember(
        &self,
        text: &str,
        user_id: &str,
        metadata: Metadata,
    ) -> Result<RememberReport> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidRequest("Cannot store empty text".into()));
        }

        let mut metadata = metadata;
        metadata
            .entry("user_id".to_string())
            .or_insert_with(|| serde_json::Value::String(user_id.to_string()));

        let (memory, vector) = tokio::join!(
            self.memory.ingest(text, user_id, &metadata),
            self.vector.ingest(text, user_id, &metadata),
        );

        let mut report = RememberReport::default();
        match memory {
            Ok(()) => report.memory_stored = true,
            Err(e) => {
                warn!("Memory store rejected entry: {}", e);
                report.errors.push(e.to_string());
            }
        }
        match vector {
            Ok(()) => report.vector_stored = true,
            Err(e) => {
                warn!("Vector index rejected entry: {}", e);
                report.errors.push(e.to_string());
            }
        }

        Ok(report)
    }

    /// Health of both subsystems
    pub async fn status(&self) -> Vec<SubsystemStatus> {
        let mut statuses = Vec::with_capacity(Subsystem::ALL.len());

        for subsystem in Subsystem::ALL {
            let adapter = self.adapter(subsystem);
            let (healthy, error) = match adapter.health_check().await {
                Ok(healthy) => (healthy, None),
                Err(e) => (false, Some(e.to_string())),
            };
            statuses.push(SubsystemStatus {
                subsystem,
                backend: adapter.backend_id().to_string(),
                available: adapter.is_available(),
                healthy,
                error,
            });
        }

        statuses
    }

    /// Release backend connections and flush local indexes.
    ///
    /// Both adapters are closed even if the first one fails; the first error
    /// is returned.
    pub async fn close(&self) -> Result<()> {
        let (memory, vector) = tokio::join!(self.memory.close(), self.vector.close());

        if let Err(e) = &memory {
            warn!("Failed to close memory subsystem: {}", e);
        }
        if let Err(e) = &vector {
            warn!("Failed to close vector subsystem: {}", e);
        }

        info!("Retrieval coordinator closed");
        memory.and(vector)
    }
}

/// Log warnings and fail on validation errors
fn check_config(config: &CoordinatorConfig) -> Result<()> {
    let validation = validate_config(config);
    for issue in &validation.warnings {
        warn!("Config warning at {}: {}", issue.path, issue.message);
    }
    validation.into_result()
}

async fn build_memory_adapter(config: &CoordinatorConfig) -> Result<Arc<dyn SearchAdapter>> {
    let memory = &config.memory;

    let adapter: Arc<dyn SearchAdapter> = match memory.backend {
        MemoryBackendType::Disabled => {
            info!("Memory subsystem disabled");
            Arc::new(UnavailableAdapter::new(
                Subsystem::Memory,
                "disabled in configuration",
            ))
        }
        MemoryBackendType::InMemory => Arc::new(
            MemoryAdapter::new(Arc::new(InMemoryStore::new())).with_cost(memory.cost_per_query),
        ),
        MemoryBackendType::Postgres => {
            let pg = memory.postgres.as_ref().ok_or_else(|| {
                Error::Config("memory.postgres is required for the postgres backend".into())
            })?;
            match init_pool(pg, false).await {
                Ok(pool) => Arc::new(
                    MemoryAdapter::new(Arc::new(PgMemoryStore::new(pool)))
                        .with_cost(memory.cost_per_query),
                ),
                Err(e) => {
                    warn!("Memory store unreachable, running without it: {}", e);
                    Arc::new(UnavailableAdapter::new(Subsystem::Memory, e.to_string()))
                }
            }
        }
    };

    Ok(adapter)
}

async fn build_vector_adapter(config: &CoordinatorConfig) -> Result<Arc<dyn SearchAdapter>> {
    let vector = &config.vector;

    let backend: Arc<dyn crate::core::VectorBackend> = match vector.backend {
        VectorBackendType::Disabled => {
            info!("Vector subsystem disabled");
            return Ok(Arc::new(UnavailableAdapter::new(
                Subsystem::Vector,
                "disabled in configuration",
            )));
        }
        VectorBackendType::Local => {
            match LocalVectorIndex::open(&vector.persist_dir, &vector.collection).await {
                Ok(index) => Arc::new(index),
                Err(e) => {
                    warn!("Local vector index could not be opened: {}", e);
                    return Ok(Arc::new(UnavailableAdapter::new(
                        Subsystem::Vector,
                        e.to_string(),
                    )));
                }
            }
        }
        VectorBackendType::Postgres => {
            let pg = vector.postgres.as_ref().ok_or_else(|| {
                Error::Config("vector.postgres is required for the postgres backend".into())
            })?;
            match init_pool(pg, true).await {
                Ok(pool) => Arc::new(PgVectorIndex::new(pool, vector.collection.clone())),
                Err(e) => {
                    warn!("Vector index unreachable, running without it: {}", e);
                    return Ok(Arc::new(UnavailableAdapter::new(
                        Subsystem::Vector,
                        e.to_string(),
                    )));
                }
            }
        }
    };

    // Model loads on first use and is shared by every query afterwards
    let embedder = EmbeddingService::new(&vector.embedding)?;
    let adapter = VectorAdapter::new(Arc::new(embedder), backend)
        .with_cache(EmbeddingCache::new(&vector.embedding))
        .with_cost(vector.cost_per_query);

    Ok(Arc::new(adapter))
}
