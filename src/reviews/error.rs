use thiserror::Error;

/// Errors surfaced by the review workflow.
///
/// Policy violations and configuration errors are never corrected silently;
/// they always reach the caller.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// An operation that the workflow rules forbid, e.g. recording a decision
    /// against a closed review or closing a review with pending decisions.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// Required configuration is missing or inconsistent, e.g. no chamber
    /// mapped for a declared institution. Halts the operation; no default is
    /// guessed.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Two writers raced on the same review and the retry also lost.
    #[error("concurrent modification of review {review_id}")]
    ConcurrencyConflict { review_id: i64 },

    /// Entity referenced by id does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl WorkflowError {
    pub fn policy(msg: impl Into<String>) -> Self {
        WorkflowError::PolicyViolation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        WorkflowError::ConfigurationError(msg.into())
    }

    pub fn not_found(kind: &'static str, id: i64) -> Self {
        WorkflowError::NotFound { kind, id }
    }
}
