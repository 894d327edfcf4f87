//! Configuration validation
//!
//! Validates configuration and reports issues. Errors make coordinator
//! construction fail; warnings are only logged.

use super::types::storage::{MemoryBackendType, VectorBackendType};
use super::types::CoordinatorConfig;
use crate::error::{Error, Result};
use crate::memory::embedding::resolve_model;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }

    /// Turn validation errors into a single `Error::Config`
    pub fn into_result(self) -> Result<()> {
        if self.valid {
            return Ok(());
        }

        let message = self
            .errors
            .iter()
            .map(|issue| format!("{}: {}", issue.path, issue.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::Config(message))
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Validate the configuration
pub fn validate_config(config: &CoordinatorConfig) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_retrieval_config(config, result);
    result = validate_merge_config(config, result);
    result = validate_memory_config(config, result);
    result = validate_vector_config(config, result);

    if config.memory.backend == MemoryBackendType::Disabled
        && config.vector.backend == VectorBackendType::Disabled
    {
        result = result.with_warning(ValidationIssue::new(
            "memory.backend, vector.backend",
            "Both subsystems are disabled. Every query will return an empty result set.",
        ));
    }

    result
}

fn validate_retrieval_config(
    config: &CoordinatorConfig,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    let retrieval = &config.retrieval;

    if retrieval.default_limit == 0 {
        result = result.with_error(
            ValidationIssue::new("retrieval.default_limit", "Default limit must be greater than 0")
                .with_suggestion("Set retrieval.default_limit to 5"),
        );
    }

    if retrieval.max_results_per_subsystem == 0 {
        result = result.with_error(ValidationIssue::new(
            "retrieval.max_results_per_subsystem",
            "Per-subsystem result cap must be greater than 0",
        ));
    }

    if retrieval.memory_timeout.is_zero() || retrieval.vector_timeout.is_zero() {
        result = result.with_error(
            ValidationIssue::new("retrieval", "Subsystem timeouts must be non-zero")
                .with_suggestion("Use a humantime value such as \"5s\" or \"500ms\""),
        );
    }

    result
}

fn validate_merge_config(
    config: &CoordinatorConfig,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    let threshold = config.merge.memory_rescale_threshold;
    if !threshold.is_finite() || threshold <= 0.0 {
        result = result.with_error(ValidationIssue::new(
            "merge.memory_rescale_threshold",
            format!("Rescale threshold must be a positive number, got {}", threshold),
        ));
    }

    result
}

fn validate_memory_config(
    config: &CoordinatorConfig,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    if config.memory.backend == MemoryBackendType::Postgres && config.memory.postgres.is_none() {
        result = result.with_error(
            ValidationIssue::new(
                "memory.postgres",
                "PostgreSQL memory backend selected but not configured",
            )
            .with_suggestion("Set RECALL_MEMORY_DATABASE_URL or configure memory.postgres"),
        );
    }

    if config.memory.cost_per_query < 0.0 {
        result = result.with_error(ValidationIssue::new(
            "memory.cost_per_query",
            "Cost must not be negative",
        ));
    }

    result
}

fn validate_vector_config(
    config: &CoordinatorConfig,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    let vector = &config.vector;
    if vector.backend == VectorBackendType::Disabled {
        return result;
    }

    if vector.collection.trim().is_empty() {
        result = result.with_error(ValidationIssue::new(
            "vector.collection",
            "Collection name must not be empty",
        ));
    }

    if vector.backend == VectorBackendType::Postgres && vector.postgres.is_none() {
        result = result.with_error(
            ValidationIssue::new(
                "vector.postgres",
                "PostgreSQL vector backend selected but not configured",
            )
            .with_suggestion("Set RECALL_VECTOR_DATABASE_URL or configure vector.postgres"),
        );
    }

    if vector.backend == VectorBackendType::Local && !vector.persist_dir.exists() {
        result = result.with_warning(ValidationIssue::new(
            "vector.persist_dir",
            format!(
                "Index directory does not exist and will be created: {}",
                vector.persist_dir.display()
            ),
        ));
    }

    if let Err(e) = resolve_model(&vector.embedding.model) {
        result = result.with_error(
            ValidationIssue::new("vector.embedding.model", e.to_string())
                .with_suggestion("Use multilingual-e5-small, all-minilm-l6-v2 or bge-small-en-v1.5"),
        );
    }

    if vector.cost_per_query < 0.0 {
        result = result.with_error(ValidationIssue::new(
            "vector.cost_per_query",
            "Cost must not be negative",
        ));
    }

    result
}
