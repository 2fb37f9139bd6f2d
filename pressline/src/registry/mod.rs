//! The stage registry: the fixed, ordered pipeline topology.
//!
//! Purely declarative; the orchestrator walks it, the registry never
//! executes anything itself.

mod standard;

pub use standard::{standard_registry, StageBindings};

use crate::context::RunStatus;
use crate::errors::PipelineError;
use crate::stages::Stage;
use std::collections::HashSet;

/// An ordered or unordered bundle of stages sharing an execution mode.
#[derive(Debug, Clone)]
pub struct StageGroup {
    /// Group id.
    pub id: String,
    /// Human-readable name used in progress events.
    pub display_name: String,
    /// True when stages in the group execute concurrently.
    pub parallel: bool,
    /// The run status set while this group executes.
    pub phase: RunStatus,
    /// The stages. Order matters only when `parallel` is false.
    pub stages: Vec<Stage>,
}

impl StageGroup {
    /// Creates a sequential group.
    #[must_use]
    pub fn sequential(
        id: impl Into<String>,
        display_name: impl Into<String>,
        phase: RunStatus,
        stages: Vec<Stage>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            parallel: false,
            phase,
            stages,
        }
    }

    /// Creates a parallel group.
    #[must_use]
    pub fn parallel(
        id: impl Into<String>,
        display_name: impl Into<String>,
        phase: RunStatus,
        stages: Vec<Stage>,
    ) -> Self {
        Self {
            parallel: true,
            ..Self::sequential(id, display_name, phase, stages)
        }
    }

    /// Returns the number of stages in the group.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// The fixed, ordered list of stage groups defining a pipeline.
#[derive(Debug, Clone)]
pub struct StageRegistry {
    groups: Vec<StageGroup>,
}

impl StageRegistry {
    /// Builds a registry, validating that stage ids are unique across
    /// every group. Checkpoints index by stage id, not position, so a
    /// duplicate would silently merge two stages' resume state.
    pub fn new(groups: Vec<StageGroup>) -> Result<Self, PipelineError> {
        let mut seen = HashSet::new();
        for group in &groups {
            for stage in &group.stages {
                if !seen.insert(stage.id.clone()) {
                    return Err(PipelineError::DuplicateStageId(stage.id.clone()));
                }
            }
        }
        Ok(Self { groups })
    }

    /// Returns the groups in declared execution order.
    #[must_use]
    pub fn groups(&self) -> &[StageGroup] {
        &self.groups
    }

    /// Total stage count across all groups; the denominator for
    /// percent-complete reporting.
    #[must_use]
    pub fn total_stage_count(&self) -> usize {
        self.groups.iter().map(StageGroup::stage_count).sum()
    }

    /// Looks up a stage by id. Introspection only, not on the hot path.
    #[must_use]
    pub fn find_stage(&self, id: &str) -> Option<(&StageGroup, &Stage)> {
        self.groups.iter().find_map(|group| {
            group
                .stages
                .iter()
                .find(|stage| stage.id == id)
                .map(|stage| (group, stage))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::NoOpStageExec;
    use std::sync::Arc;

    fn stage(id: &str) -> Stage {
        Stage::required(id, id, Arc::new(NoOpStageExec))
    }

    fn two_group_registry() -> StageRegistry {
        StageRegistry::new(vec![
            StageGroup::sequential(
                "validation",
                "Validation",
                RunStatus::Researching,
                vec![stage("dedup-check")],
            ),
            StageGroup::parallel(
                "enrichment",
                "Enrichment",
                RunStatus::Researching,
                vec![stage("research"), stage("author-match")],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_total_stage_count() {
        let registry = two_group_registry();
        assert_eq!(registry.total_stage_count(), 3);
    }

    #[test]
    fn test_groups_preserve_order() {
        let registry = two_group_registry();
        let ids: Vec<_> = registry.groups().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["validation", "enrichment"]);
    }

    #[test]
    fn test_find_stage() {
        let registry = two_group_registry();
        let (group, stage) = registry.find_stage("research").unwrap();
        assert_eq!(group.id, "enrichment");
        assert_eq!(stage.id, "research");

        assert!(registry.find_stage("missing").is_none());
    }

    #[test]
    fn test_duplicate_stage_id_rejected() {
        let result = StageRegistry::new(vec![
            StageGroup::sequential(
                "a",
                "A",
                RunStatus::Researching,
                vec![stage("dup")],
            ),
            StageGroup::sequential(
                "b",
                "B",
                RunStatus::Generating,
                vec![stage("dup")],
            ),
        ]);

        assert!(matches!(
            result,
            Err(PipelineError::DuplicateStageId(id)) if id == "dup"
        ));
    }
}
