//! The run context: the single mutable object threaded through every stage.

use super::{CampaignConfig, RunStatus, SourceItem, TargetSite};
use crate::quality::{QualityAssessment, ReviewDecision};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Shared handle to the run context.
///
/// Stages within a parallel group hold the same handle and write to disjoint
/// sub-structures; the lock is held only for the duration of a field write,
/// never across an await point.
pub type SharedContext = Arc<Mutex<RunContext>>;

/// Artifacts produced by the enrichment group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentData {
    /// Research lookup results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<serde_json::Value>,
    /// The matched author identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_author: Option<serde_json::Value>,
}

/// Artifacts produced by the generation and enhancement groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationData {
    /// The generated content body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// References to generated images.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_refs: Vec<String>,
}

/// Quality-gate outcome for the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityData {
    /// The computed quality assessment, written by the scoring stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<QualityAssessment>,
    /// The review decision, written by the smart-review stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<ReviewDecision>,
    /// True when the run was flagged for downstream visibility.
    #[serde(default)]
    pub flagged: bool,
    /// True when publish must force draft status for manual review.
    #[serde(default)]
    pub needs_manual_review: bool,
}

/// Artifacts produced by the optimization and publish groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishData {
    /// The primary publish result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Multi-destination publish report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_site_report: Option<serde_json::Value>,
    /// A/B test identifier, if one was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ab_test_id: Option<String>,
}

/// The mutable, run-scoped accumulator passed to every stage.
///
/// Each stage group owns a named sub-structure, so two stages running
/// concurrently in a parallel group never target the same field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// Unique id for this run.
    pub run_id: String,
    /// The run this one was resumed or retried from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<String>,
    /// The owning campaign id.
    pub owner_id: String,
    /// The source item id.
    pub item_id: String,
    /// The source item under processing.
    pub item: SourceItem,
    /// The publish destination.
    pub target: TargetSite,
    /// Coarse lifecycle status.
    #[serde(default)]
    pub status: RunStatus,
    /// Terminal error message when the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Enrichment-group artifacts.
    #[serde(default)]
    pub enrichment: EnrichmentData,
    /// Generation/enhancement artifacts.
    #[serde(default)]
    pub generation: GenerationData,
    /// Quality-gate outcome.
    #[serde(default)]
    pub quality: QualityData,
    /// Optimization/publish artifacts.
    #[serde(default)]
    pub publish: PublishData,
}

impl RunContext {
    /// Creates a fresh context for one run of (campaign, item, target).
    #[must_use]
    pub fn new(config: &CampaignConfig, item: SourceItem, target: TargetSite) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            parent_run_id: None,
            owner_id: config.id.clone(),
            item_id: item.id.clone(),
            item,
            target,
            status: RunStatus::Pending,
            error: None,
            enrichment: EnrichmentData::default(),
            generation: GenerationData::default(),
            quality: QualityData::default(),
            publish: PublishData::default(),
        }
    }

    /// Sets the parent run id.
    #[must_use]
    pub fn with_parent_run_id(mut self, parent: impl Into<String>) -> Self {
        self.parent_run_id = Some(parent.into());
        self
    }

    /// Serializes the context for checkpoint persistence.
    pub fn snapshot(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Restores artifact sub-structures from a checkpoint snapshot.
    ///
    /// Identity fields (run id, item, target, status) stay fresh; only the
    /// accumulated artifacts and quality flags carry over, so conditions
    /// re-evaluate against the same partially-populated state the original
    /// run had.
    pub fn merge_snapshot(&mut self, snapshot: &serde_json::Value) -> Result<(), serde_json::Error> {
        let restored: Self = serde_json::from_value(snapshot.clone())?;
        self.enrichment = restored.enrichment;
        self.generation = restored.generation;
        self.quality = restored.quality;
        self.publish = restored.publish;
        Ok(())
    }

    /// Wraps the context in a shared handle for stage execution.
    #[must_use]
    pub fn into_shared(self) -> SharedContext {
        Arc::new(Mutex::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context() -> RunContext {
        let config = CampaignConfig::new("campaign-1");
        let item = SourceItem::new("item-1", "Topic");
        let target = TargetSite::new("site-1", "Example", "https://example.com");
        RunContext::new(&config, item, target)
    }

    #[test]
    fn test_new_context_is_pending() {
        let ctx = test_context();
        assert_eq!(ctx.status, RunStatus::Pending);
        assert_eq!(ctx.owner_id, "campaign-1");
        assert_eq!(ctx.item_id, "item-1");
        assert!(ctx.error.is_none());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut ctx = test_context();
        ctx.generation.content = Some("body".to_string());
        ctx.quality.flagged = true;

        let snapshot = ctx.snapshot().unwrap();

        let mut fresh = test_context();
        fresh.merge_snapshot(&snapshot).unwrap();

        assert_eq!(fresh.generation.content.as_deref(), Some("body"));
        assert!(fresh.quality.flagged);
    }

    #[test]
    fn test_merge_snapshot_keeps_fresh_identity() {
        let mut ctx = test_context();
        ctx.status = RunStatus::Failed;
        ctx.error = Some("boom".to_string());
        let snapshot = ctx.snapshot().unwrap();

        let mut fresh = test_context();
        let fresh_run_id = fresh.run_id.clone();
        fresh.merge_snapshot(&snapshot).unwrap();

        assert_eq!(fresh.run_id, fresh_run_id);
        assert_eq!(fresh.status, RunStatus::Pending);
        assert!(fresh.error.is_none());
    }

    #[test]
    fn test_with_parent_run_id() {
        let ctx = test_context().with_parent_run_id("run-0");
        assert_eq!(ctx.parent_run_id.as_deref(), Some("run-0"));
    }
}
