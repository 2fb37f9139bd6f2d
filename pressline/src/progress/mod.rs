//! Progress reporting sinks.
//!
//! The orchestrator is a pure function of (registry, checkpoint store, sink)
//! plus its inputs: all progress and status reporting flows through an
//! injected [`ProgressSink`], never ambient global state.

use crate::context::RunStatus;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A progress event, emitted at least once per group transition and once
/// per completed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Display name of the currently executing group.
    pub phase: String,
    /// Ids of all stages completed so far.
    pub completed_stages: Vec<String>,
    /// Total stage count across the registry.
    pub total_stages: usize,
    /// Rounded percent complete.
    pub percentage: u8,
    /// The run's coarse status.
    pub status: RunStatus,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

impl ProgressUpdate {
    /// Creates an update, computing the rounded percentage.
    #[must_use]
    pub fn new(
        phase: impl Into<String>,
        completed_stages: Vec<String>,
        total_stages: usize,
        status: RunStatus,
    ) -> Self {
        let percentage = if total_stages == 0 {
            100
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let pct =
                (completed_stages.len() as f64 / total_stages as f64 * 100.0).round() as u8;
            pct.min(100)
        };
        Self {
            phase: phase.into(),
            completed_stages,
            total_stages,
            percentage,
            status,
            timestamp: Utc::now(),
        }
    }
}

/// Receives human-readable progress events from the orchestrator.
///
/// Implementations must not block and must not fail; delivery is
/// fire-and-forget from the orchestrator's point of view.
pub trait ProgressSink: Send + Sync {
    /// Called with each progress event.
    fn on_progress(&self, update: &ProgressUpdate);

    /// Called whenever the coarse run status changes.
    fn on_status_change(&self, status: RunStatus);
}

/// A sink that discards all events. The default when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn on_progress(&self, _update: &ProgressUpdate) {}

    fn on_status_change(&self, _status: RunStatus) {}
}

/// A sink that logs events through the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_progress(&self, update: &ProgressUpdate) {
        info!(
            phase = %update.phase,
            completed = update.completed_stages.len(),
            total = update.total_stages,
            percentage = update.percentage,
            status = %update.status,
            "pipeline progress"
        );
    }

    fn on_status_change(&self, status: RunStatus) {
        info!(status = %status, "pipeline status change");
    }
}

/// A collecting sink for tests.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    updates: RwLock<Vec<ProgressUpdate>>,
    statuses: RwLock<Vec<RunStatus>>,
}

impl CollectingProgressSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected progress updates.
    #[must_use]
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.read().clone()
    }

    /// Returns all observed status changes, in order.
    #[must_use]
    pub fn statuses(&self) -> Vec<RunStatus> {
        self.statuses.read().clone()
    }

    /// Returns the last progress update, if any.
    #[must_use]
    pub fn last_update(&self) -> Option<ProgressUpdate> {
        self.updates.read().last().cloned()
    }
}

impl ProgressSink for CollectingProgressSink {
    fn on_progress(&self, update: &ProgressUpdate) {
        self.updates.write().push(update.clone());
    }

    fn on_status_change(&self, status: RunStatus) {
        self.statuses.write().push(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_math() {
        let update = ProgressUpdate::new(
            "Generation",
            vec!["a".to_string(), "b".to_string()],
            3,
            RunStatus::Generating,
        );
        assert_eq!(update.percentage, 67);

        let done = ProgressUpdate::new(
            "Publish",
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            3,
            RunStatus::Done,
        );
        assert_eq!(done.percentage, 100);
    }

    #[test]
    fn test_percentage_empty_registry() {
        let update = ProgressUpdate::new("Validation", Vec::new(), 0, RunStatus::Pending);
        assert_eq!(update.percentage, 100);
    }

    #[test]
    fn test_noop_sink() {
        let sink = NoOpProgressSink;
        sink.on_progress(&ProgressUpdate::new("x", Vec::new(), 1, RunStatus::Pending));
        sink.on_status_change(RunStatus::Done);
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingProgressSink::new();
        assert!(sink.last_update().is_none());

        sink.on_progress(&ProgressUpdate::new(
            "Validation",
            Vec::new(),
            2,
            RunStatus::Researching,
        ));
        sink.on_status_change(RunStatus::Researching);
        sink.on_status_change(RunStatus::Done);

        assert_eq!(sink.updates().len(), 1);
        assert_eq!(
            sink.statuses(),
            vec![RunStatus::Researching, RunStatus::Done]
        );
        assert_eq!(sink.last_update().unwrap().phase, "Validation");
    }

    #[test]
    fn test_update_serializes() {
        let update = ProgressUpdate::new("Enrichment", vec!["a".to_string()], 4, RunStatus::Researching);
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"percentage\":25"));
    }
}
