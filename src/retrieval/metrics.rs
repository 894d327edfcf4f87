//! Per-subsystem timing and cost collection

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tracing::{debug, error, warn};

use crate::core::{QueryRequest, RawHit, SearchAdapter, Subsystem, SubsystemMetrics};
use crate::error::Error;

/// Result of one timed subsystem call.
///
/// Always carries metrics; `hits` is empty when the call failed.
#[derive(Debug, Clone)]
pub struct SubsystemOutcome {
    /// Subsystem that was called
    pub subsystem: Subsystem,
    /// Raw hits, capped at the requested limit
    pub hits: Vec<RawHit>,
    /// Timing, cost and failure flag
    pub metrics: SubsystemMetrics,
}

impl SubsystemOutcome {
    fn failed(subsystem: Subsystem, elapsed: Duration, error: &Error) -> Self {
        let elapsed_ms = elapsed.as_millis() as u64;
        if error.is_subsystem_failure() {
            warn!(subsystem = %subsystem, elapsed_ms, "Subsystem search failed: {}", error);
        } else {
            // Panics and bad requests reaching an adapter are bugs, not outages
            error!(subsystem = %subsystem, elapsed_ms, "Subsystem search errored: {}", error);
        }
        SubsystemOutcome {
            subsystem,
            hits: Vec::new(),
            metrics: SubsystemMetrics::failed(elapsed, error),
        }
    }

    /// Outcome for a search task that panicked or was aborted
    pub fn from_join_error(subsystem: Subsystem, elapsed: Duration, err: JoinError) -> Self {
        let error = Error::Internal(format!("{} search task did not complete: {}", subsystem, err));
        Self::failed(subsystem, elapsed, &error)
    }
}

/// Run one adapter search under a timeout, measuring wall-clock time
pub async fn timed_search(
    adapter: Arc<dyn SearchAdapter>,
    request: Arc<QueryRequest>,
    limit: usize,
    timeout: Duration,
) -> SubsystemOutcome {
    let subsystem = adapter.subsystem();
    let started = Instant::now();
    let result = tokio::time::timeout(timeout, adapter.search(&request, limit)).await;
    let elapsed = started.elapsed();

    match result {
        Ok(Ok(output)) => {
            let mut hits = output.hits;
            hits.truncate(limit);
            debug!(
                subsystem = %subsystem,
                backend = adapter.backend_id(),
                hits = hits.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Subsystem search completed"
            );
            SubsystemOutcome {
                subsystem,
                metrics: SubsystemMetrics::succeeded(elapsed, output.cost, hits.len()),
                hits,
            }
        }
        Ok(Err(e)) => SubsystemOutcome::failed(subsystem, elapsed, &e),
        Err(_) => {
            let e = Error::Timeout(format!("{} search exceeded {:?}", subsystem, timeout));
            SubsystemOutcome::failed(subsystem, elapsed, &e)
        }
    }
}
