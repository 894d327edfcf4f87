//! Subsystem adapter capability
//!
//! The coordinator sees both retrieval subsystems through `SearchAdapter` and
//! never special-cases which one is primary. A subsystem that is disabled or
//! failed to initialize is represented by `UnavailableAdapter`, chosen once at
//! construction time.

use async_trait::async_trait;

use super::types::{Metadata, QueryRequest, RawHit, Subsystem};
use crate::error::{Error, Result};

/// What an adapter returns for one search
#[derive(Debug, Clone, Default)]
pub struct AdapterOutput {
    /// Hits in subsystem-native form
    pub hits: Vec<RawHit>,
    /// Monetary cost of the call
    pub cost: f64,
}

impl AdapterOutput {
    /// Output with zero cost
    pub fn new(hits: Vec<RawHit>) -> Self {
        AdapterOutput { hits, cost: 0.0 }
    }

    /// Set the cost
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }
}

/// Common capability of every retrieval subsystem
#[async_trait]
pub trait SearchAdapter: Send + Sync {
    /// Which subsystem this adapter fronts
    fn subsystem(&self) -> Subsystem;

    /// Backend identifier for logs and status output
    fn backend_id(&self) -> &str;

    /// Whether a backend is wired up at all
    fn is_available(&self) -> bool {
        true
    }

    /// Search for up to `limit` hits.
    ///
    /// Failures must surface as `SubsystemUnavailable` or `Embedding`.
    async fn search(&self, request: &QueryRequest, limit: usize) -> Result<AdapterOutput>;

    /// Store a new entry in the backend
    async fn ingest(&self, text: &str, user_id: &str, metadata: &Metadata) -> Result<()>;

    /// Health check
    async fn health_check(&self) -> Result<bool>;

    /// Release backend resources
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Stand-in for a subsystem that is disabled or could not be initialized
#[derive(Debug, Clone)]
pub struct UnavailableAdapter {
    subsystem: Subsystem,
    reason: String,
}

impl UnavailableAdapter {
    /// Create a stub that fails every call with `reason`
    pub fn new(subsystem: Subsystem, reason: impl Into<String>) -> Self {
        UnavailableAdapter {
            subsystem,
            reason: reason.into(),
        }
    }

    /// Why the subsystem is unavailable
    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn error(&self) -> Error {
        Error::unavailable(self.subsystem, self.reason.clone())
    }
}

#[async_trait]
impl SearchAdapter for UnavailableAdapter {
    fn subsystem(&self) -> Subsystem {
        self.subsystem
    }

    fn backend_id(&self) -> &str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn search(&self, _request: &QueryRequest, _limit: usize) -> Result<AdapterOutput> {
        Err(self.error())
    }

    async fn ingest(&self, _text: &str, _user_id: &str, _metadata: &Metadata) -> Result<()> {
        Err(self.error())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_adapter_fails_search() {
        let adapter = UnavailableAdapter::new(Subsystem::Vector, "disabled in config");
        assert!(!adapter.is_available());
        assert_eq!(adapter.reason(), "disabled in config");

        let request = QueryRequest::new("anything", "user");
        match adapter.search(&request, 5).await {
            Err(Error::SubsystemUnavailable { subsystem, reason }) => {
                assert_eq!(subsystem, Subsystem::Vector);
                assert_eq!(reason, "disabled in config");
            }
            other => panic!("expected SubsystemUnavailable, got {:?}", other),
        }

        assert!(!adapter.health_check().await.unwrap());
    }
}
