//! Domain-level error taxonomy for the evaluation pipeline.
//!
//! Scanner tool failures are deliberately absent from this taxonomy:
//! they are absorbed at the orchestrator boundary and contribute zero
//! findings instead of surfacing as errors.

/// Errors produced while evaluating a package.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Source could not be fetched or unpacked. Fatal; aborts the job
    /// before any scanning occurs.
    #[error("source acquisition failed: {0}")]
    Acquisition(String),

    /// Identifier matched none of the supported origin kinds.
    #[error("cannot classify package identifier: {0}")]
    Classification(String),

    /// The package's server process failed to start or never became
    /// ready. Degrades the runtime sub-score; does not abort the job.
    #[error("server launch failed: {0}")]
    Launch(String),

    /// Report could not be written or read back. Fatal.
    #[error("report persistence failed: {0}")]
    Persistence(String),

    /// Request-level validation failure (empty identifier, malformed
    /// env override).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for evaluation domain operations.
pub type Result<T> = std::result::Result<T, EvalError>;
