//! Run status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The coarse-grained lifecycle status of a pipeline run.
///
/// Stage groups set this to their phase label while they execute; the
/// orchestrator sets the terminal `Done`/`Failed` states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run created, no group has started yet.
    Pending,
    /// Validation and enrichment groups are executing.
    Researching,
    /// Generation, enhancement, and quality-gate groups are executing.
    Generating,
    /// Optimization and publish groups are executing.
    Publishing,
    /// All groups completed.
    Done,
    /// A required stage failed.
    Failed,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Researching => write!(f, "researching"),
            Self::Generating => write!(f, "generating"),
            Self::Publishing => write!(f, "publishing"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl RunStatus {
    /// Returns true if the status is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}
