//! Error types for the pressline orchestrator.
//!
//! Only fatal conditions surface here: a required stage failing, a broken
//! registry, or checkpoint persistence going wrong. Condition skips and
//! tolerated optional-stage failures never become a `PipelineError`.

use thiserror::Error;

/// The main error type for pipeline runs.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required stage failed, aborting the run.
    #[error("{stage}: {message}")]
    StageFailed {
        /// The display name of the failed stage.
        stage: String,
        /// The underlying error message.
        message: String,
    },

    /// Two stages in the registry share the same id.
    #[error("duplicate stage id in registry: {0}")]
    DuplicateStageId(String),

    /// The checkpoint store failed to save, load, or clear a checkpoint.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Creates a stage-failure error from a stage name and any error message.
    #[must_use]
    pub fn stage_failed(stage: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            "stage failed without an error message".to_string()
        } else {
            message
        };
        Self::StageFailed {
            stage: stage.into(),
            message,
        }
    }
}
