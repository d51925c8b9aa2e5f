//! Domain errors for the edgewise engine.

use thiserror::Error;

/// Domain-level errors that can occur in the engine.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Hypothesis not found: {0}")]
    HypothesisNotFound(String),

    #[error("Handoff not found: {0}")]
    HandoffNotFound(String),

    #[error("Scheduled task not found: {0}")]
    TaskNotFound(String),

    #[error("Responsibility not found: {role}/{name}")]
    ResponsibilityNotFound { role: String, name: String },

    #[error("Invalid transition from {from} to {to}: {reason}")]
    InvalidTransition { from: String, to: String, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Insufficient sample: {actual} trades recorded, {required} required")]
    InsufficientSample { required: u32, actual: u32 },

    #[error("Hypothesis {id} is {status} and no longer accepts evidence")]
    HypothesisNotActive { id: String, status: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Whether this error is a validation failure that was rejected
    /// before anything was written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. }
                | Self::MissingField(_)
                | Self::InsufficientSample { .. }
                | Self::HypothesisNotActive { .. }
                | Self::ValidationFailed(_)
        )
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::StoreError(err.to_string())
    }
}
