//! Stage contracts and results.
//!
//! A [`Stage`] is a description: an id, an optionality flag, an applicability
//! condition, and an injected [`StageExec`] implementation. The concrete work
//! (generation, research, publishing) lives behind the trait.

use crate::context::{CampaignConfig, SharedContext, TargetSite};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Execution contract for a unit of pipeline work.
///
/// Implementations mutate the shared run context in place and fail with a
/// descriptive error. The context lock must never be held across an await.
#[async_trait]
pub trait StageExec: Send + Sync + Debug {
    /// Executes the stage against the shared run context.
    async fn execute(
        &self,
        ctx: &SharedContext,
        config: &CampaignConfig,
        target: &TargetSite,
    ) -> anyhow::Result<()>;
}

/// Applicability predicate evaluated before each execution attempt.
///
/// Must be pure and cheap: it is re-evaluated on resume against a
/// partially-populated context, so side effects would be observed twice.
pub type StageCondition =
    Arc<dyn Fn(&crate::context::RunContext, &CampaignConfig) -> bool + Send + Sync>;

/// A stage description within the registry.
#[derive(Clone)]
pub struct Stage {
    /// Stable id, unique across the whole registry.
    pub id: String,
    /// Human-readable name used in progress and error messages.
    pub display_name: String,
    /// Whether a failure of this stage is tolerated.
    pub optional: bool,
    /// Applicability condition; `None` means always applicable.
    pub condition: Option<StageCondition>,
    /// The injected implementation.
    pub exec: Arc<dyn StageExec>,
}

impl Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("optional", &self.optional)
            .field("has_condition", &self.condition.is_some())
            .finish()
    }
}

impl Stage {
    /// Creates a required stage with no condition.
    #[must_use]
    pub fn required(
        id: impl Into<String>,
        display_name: impl Into<String>,
        exec: Arc<dyn StageExec>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            optional: false,
            condition: None,
            exec,
        }
    }

    /// Creates an optional stage with no condition.
    #[must_use]
    pub fn optional(
        id: impl Into<String>,
        display_name: impl Into<String>,
        exec: Arc<dyn StageExec>,
    ) -> Self {
        Self {
            optional: true,
            ..Self::required(id, display_name, exec)
        }
    }

    /// Attaches an applicability condition.
    #[must_use]
    pub fn with_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&crate::context::RunContext, &CampaignConfig) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Evaluates the condition against the current context state.
    #[must_use]
    pub fn is_applicable(&self, ctx: &crate::context::RunContext, config: &CampaignConfig) -> bool {
        self.condition.as_ref().map_or(true, |cond| cond(ctx, config))
    }
}

/// The recorded outcome of one stage attempt.
///
/// Retained in checkpoints for diagnostics; the only control decision ever
/// made from it is "was this stage already completed".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Whether the stage settled successfully.
    pub success: bool,
    /// Execution time in milliseconds. Zero for skipped stages.
    pub duration_ms: u64,
    /// Error message for failed attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Optional diagnostic data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// True when the stage was skipped by its condition.
    #[serde(default)]
    pub skipped: bool,
}

impl StageResult {
    /// Creates a success result.
    #[must_use]
    pub fn success(duration_ms: u64) -> Self {
        Self {
            success: true,
            duration_ms,
            error: None,
            data: None,
            skipped: false,
        }
    }

    /// Creates a failure result.
    #[must_use]
    pub fn failure(duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            duration_ms,
            error: Some(error.into()),
            data: None,
            skipped: false,
        }
    }

    /// Creates a synthetic result for a condition skip.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            success: true,
            duration_ms: 0,
            error: None,
            data: None,
            skipped: true,
        }
    }

    /// Attaches diagnostic data.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A no-op stage implementation for wiring and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpStageExec;

#[async_trait]
impl StageExec for NoOpStageExec {
    async fn execute(
        &self,
        _ctx: &SharedContext,
        _config: &CampaignConfig,
        _target: &TargetSite,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RunContext, SourceItem};

    fn test_inputs() -> (RunContext, CampaignConfig) {
        let config = CampaignConfig::new("c1");
        let ctx = RunContext::new(
            &config,
            SourceItem::new("i1", "topic"),
            TargetSite::new("s1", "Site", "https://example.com"),
        );
        (ctx, config)
    }

    #[test]
    fn test_required_stage_defaults() {
        let stage = Stage::required("generate", "Generate Content", Arc::new(NoOpStageExec));
        assert!(!stage.optional);
        assert!(stage.condition.is_none());
    }

    #[test]
    fn test_stage_without_condition_is_applicable() {
        let (ctx, config) = test_inputs();
        let stage = Stage::optional("research", "Research", Arc::new(NoOpStageExec));
        assert!(stage.is_applicable(&ctx, &config));
    }

    #[test]
    fn test_stage_condition_reads_config() {
        let (ctx, mut config) = test_inputs();
        let stage = Stage::optional("images", "Generate Images", Arc::new(NoOpStageExec))
            .with_condition(|_ctx, config| config.images_enabled);

        assert!(!stage.is_applicable(&ctx, &config));
        config.images_enabled = true;
        assert!(stage.is_applicable(&ctx, &config));
    }

    #[test]
    fn test_stage_result_factories() {
        let ok = StageResult::success(120);
        assert!(ok.success);
        assert!(!ok.skipped);

        let failed = StageResult::failure(40, "backend unavailable");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("backend unavailable"));

        let skipped = StageResult::skipped();
        assert!(skipped.success);
        assert!(skipped.skipped);
        assert_eq!(skipped.duration_ms, 0);
    }

    #[test]
    fn test_stage_result_serialization() {
        let result = StageResult::success(10).with_data(serde_json::json!({"words": 900}));
        let json = serde_json::to_string(&result).unwrap();
        let back: StageResult = serde_json::from_str(&json).unwrap();
        assert!(back.success);
        assert_eq!(back.data, Some(serde_json::json!({"words": 900})));
    }

    #[tokio::test]
    async fn test_noop_exec() {
        let (ctx, config) = test_inputs();
        let target = ctx.target.clone();
        let shared = ctx.into_shared();
        NoOpStageExec.execute(&shared, &config, &target).await.unwrap();
    }
}
