//! The orchestrator: executes one run to completion or to a well-defined
//! failure, with resume support.
//!
//! Groups execute in registry order. Sequential groups checkpoint after
//! every stage, bounding redone work after a crash to one in-flight stage;
//! parallel groups checkpoint at group granularity, since concurrent stages
//! have no well-defined mid-group position to resume from — a resumed
//! parallel group simply re-runs whichever of its stages are incomplete.


use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::context::{CampaignConfig, RunContext, RunStatus, SharedContext, SourceItem, TargetSite};
use crate::errors::PipelineError;
use crate::progress::{NoOpProgressSink, ProgressSink, ProgressUpdate};
use crate::registry::{StageGroup, StageRegistry};
use crate::stages::{Stage, StageResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Options for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Resume from a persisted checkpoint instead of starting fresh.
    pub resume_from_checkpoint: bool,
    /// The run this one continues, for lineage in telemetry.
    pub parent_run_id: Option<String>,
}

impl RunOptions {
    /// Creates default options: fresh run, no parent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables checkpoint resume.
    #[must_use]
    pub fn resume(mut self) -> Self {
        self.resume_from_checkpoint = true;
        self
    }

    /// Sets the parent run id.
    #[must_use]
    pub fn with_parent_run_id(mut self, parent: impl Into<String>) -> Self {
        self.parent_run_id = Some(parent.into());
        self
    }
}

/// A failed run: the terminal context (with `status = Failed` and `error`
/// populated) together with the error that aborted it.
///
/// The checkpoint from the last successful boundary is preserved, so the
/// caller can surface `context.error` and offer a resume instead of a
/// from-scratch restart.
#[derive(Debug)]
pub struct FailedRun {
    /// The terminal run context.
    pub context: RunContext,
    /// The fatal error.
    pub error: PipelineError,
}

impl fmt::Display for FailedRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for FailedRun {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Mutable bookkeeping for one run, shared by the group loops.
struct RunState {
    completed: Vec<String>,
    stage_data: HashMap<String, StageResult>,
    total: usize,
    status: RunStatus,
}

impl RunState {
    fn is_completed(&self, stage_id: &str) -> bool {
        self.completed.iter().any(|id| id == stage_id)
    }

    fn mark_completed(&mut self, stage_id: &str, result: StageResult) {
        if !self.is_completed(stage_id) {
            self.completed.push(stage_id.to_string());
        }
        self.stage_data.insert(stage_id.to_string(), result);
    }

    fn record_failure(&mut self, stage_id: &str, result: StageResult) {
        // Failed stages stay incomplete so a resume re-attempts them.
        self.stage_data.insert(stage_id.to_string(), result);
    }
}

/// Drives one source item through the registry's stage groups.
pub struct Orchestrator {
    registry: StageRegistry,
    store: Arc<dyn CheckpointStore>,
    sink: Arc<dyn ProgressSink>,
}

impl Orchestrator {
    /// Creates an orchestrator with a no-op progress sink.
    #[must_use]
    pub fn new(registry: StageRegistry, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            registry,
            store,
            sink: Arc::new(NoOpProgressSink),
        }
    }

    /// Sets the progress sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the registry this orchestrator walks.
    #[must_use]
    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Executes one run for (config, item, target).
    ///
    /// Returns the terminal context on success. On a required-stage failure
    /// (or a checkpoint I/O failure, which propagates identically) the
    /// returned [`FailedRun`] carries the context with `status = Failed` and
    /// `error = "<stage>: <message>"`; no further groups execute and the
    /// last checkpoint is preserved for a later resume.
    pub async fn run(
        &self,
        config: &CampaignConfig,
        item: SourceItem,
        target: TargetSite,
        options: RunOptions,
    ) -> Result<RunContext, FailedRun> {
        let mut ctx = RunContext::new(config, item, target.clone());
        if let Some(parent) = options.parent_run_id {
            ctx.parent_run_id = Some(parent);
        }

        let mut state = RunState {
            completed: Vec::new(),
            stage_data: HashMap::new(),
            total: self.registry.total_stage_count(),
            status: RunStatus::Pending,
        };

        if options.resume_from_checkpoint {
            match self.store.load(&ctx.owner_id, &ctx.item_id).await {
                Ok(Some(checkpoint)) => {
                    if let Err(err) = ctx.merge_snapshot(&checkpoint.context) {
                        return Err(self.fail(ctx, err.into(), &state));
                    }
                    state.completed = checkpoint.completed_stages;
                    state.stage_data = checkpoint.stage_data;
                    debug!(
                        owner = %ctx.owner_id,
                        item = %ctx.item_id,
                        completed = state.completed.len(),
                        "resuming from checkpoint"
                    );
                }
                Ok(None) => {}
                Err(err) => return Err(self.fail(ctx, err, &state)),
            }
        }

        let owner_id = ctx.owner_id.clone();
        let item_id = ctx.item_id.clone();
        let shared = ctx.into_shared();

        match self
            .execute_groups(&shared, config, &target, &mut state)
            .await
        {
            Ok(()) => {
                self.set_status(&shared, &mut state, RunStatus::Done);
                self.sink.on_progress(&ProgressUpdate::new(
                    "Complete",
                    state.completed.clone(),
                    state.total,
                    RunStatus::Done,
                ));
                if let Err(err) = self.store.clear(&owner_id, &item_id).await {
                    return Err(self.fail(Self::unwrap_shared(shared), err, &state));
                }
                Ok(Self::unwrap_shared(shared))
            }
            Err(err) => Err(self.fail(Self::unwrap_shared(shared), err, &state)),
        }
    }

    /// Records a fatal failure into the context and reports it.
    fn fail(&self, mut ctx: RunContext, error: PipelineError, state: &RunState) -> FailedRun {
        ctx.status = RunStatus::Failed;
        ctx.error = Some(error.to_string());
        if state.status != RunStatus::Failed {
            self.sink.on_status_change(RunStatus::Failed);
        }
        self.sink.on_progress(&ProgressUpdate::new(
            "Failed",
            state.completed.clone(),
            state.total,
            RunStatus::Failed,
        ));
        FailedRun {
            context: ctx,
            error,
        }
    }

    async fn execute_groups(
        &self,
        shared: &SharedContext,
        config: &CampaignConfig,
        target: &TargetSite,
        state: &mut RunState,
    ) -> Result<(), PipelineError> {
        for group in self.registry.groups() {
            let pending: Vec<&Stage> = group
                .stages
                .iter()
                .filter(|stage| !state.is_completed(&stage.id))
                .collect();
            if pending.is_empty() {
                debug!(group = %group.id, "group already complete, skipping");
                continue;
            }

            self.set_status(shared, state, group.phase);
            self.emit_progress(group, state);

            if group.parallel {
                self.run_parallel_group(group, pending, shared, config, target, state)
                    .await?;
            } else {
                self.run_sequential_group(group, pending, shared, config, target, state)
                    .await?;
            }

            self.save_checkpoint(shared, state).await?;
        }
        Ok(())
    }

    async fn run_sequential_group(
        &self,
        group: &StageGroup,
        pending: Vec<&Stage>,
        shared: &SharedContext,
        config: &CampaignConfig,
        target: &TargetSite,
        state: &mut RunState,
    ) -> Result<(), PipelineError> {
        for stage in pending {
            if !self.check_applicable(stage, shared, config, state, group) {
                continue;
            }

            let start = Instant::now();
            let outcome = stage.exec.execute(shared, config, target).await;
            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => {
                    state.mark_completed(&stage.id, StageResult::success(duration_ms));
                    self.emit_progress(group, state);
                    // Per-stage checkpoint: a crash redoes at most one stage.
                    self.save_checkpoint(shared, state).await?;
                }
                Err(err) => {
                    let message = err.to_string();
                    state.record_failure(&stage.id, StageResult::failure(duration_ms, &message));
                    if stage.optional {
                        warn!(
                            stage = %stage.id,
                            error = %message,
                            "optional stage failed, continuing"
                        );
                    } else {
                        return Err(PipelineError::stage_failed(&stage.display_name, message));
                    }
                }
            }
        }
        Ok(())
    }

    async fn run_parallel_group(
        &self,
        group: &StageGroup,
        pending: Vec<&Stage>,
        shared: &SharedContext,
        config: &CampaignConfig,
        target: &TargetSite,
        state: &mut RunState,
    ) -> Result<(), PipelineError> {
        let mut launched = Vec::new();
        for stage in pending {
            if !self.check_applicable(stage, shared, config, state, group) {
                continue;
            }
            launched.push(async move {
                let start = Instant::now();
                let outcome = stage.exec.execute(shared, config, target).await;
                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = start.elapsed().as_millis() as u64;
                (stage, duration_ms, outcome)
            });
        }

        // All launched stages settle before the group resolves, even when
        // one of them carries a fatal failure.
        let settled = futures::future::join_all(launched).await;

        let mut fatal: Option<PipelineError> = None;
        for (stage, duration_ms, outcome) in settled {
            match outcome {
                Ok(()) => {
                    state.mark_completed(&stage.id, StageResult::success(duration_ms));
                    self.emit_progress(group, state);
                }
                Err(err) => {
                    let message = err.to_string();
                    state.record_failure(&stage.id, StageResult::failure(duration_ms, &message));
                    if stage.optional {
                        warn!(
                            stage = %stage.id,
                            error = %message,
                            "optional stage failed, continuing"
                        );
                    } else if fatal.is_none() {
                        fatal = Some(PipelineError::stage_failed(&stage.display_name, message));
                    }
                }
            }
        }

        fatal.map_or(Ok(()), Err)
    }

    /// Evaluates a stage condition; false marks the stage completed with a
    /// synthetic skipped result. Returns whether the stage should execute.
    fn check_applicable(
        &self,
        stage: &Stage,
        shared: &SharedContext,
        config: &CampaignConfig,
        state: &mut RunState,
        group: &StageGroup,
    ) -> bool {
        let applicable = {
            let guard = shared.lock();
            stage.is_applicable(&guard, config)
        };
        if !applicable {
            debug!(stage = %stage.id, "condition false, skipping");
            state.mark_completed(&stage.id, StageResult::skipped());
            self.emit_progress(group, state);
        }
        applicable
    }

    fn set_status(&self, shared: &SharedContext, state: &mut RunState, status: RunStatus) {
        shared.lock().status = status;
        if state.status != status {
            state.status = status;
            self.sink.on_status_change(status);
        }
    }

    fn emit_progress(&self, group: &StageGroup, state: &RunState) {
        self.sink.on_progress(&ProgressUpdate::new(
            group.display_name.clone(),
            state.completed.clone(),
            state.total,
            state.status,
        ));
    }

    async fn save_checkpoint(
        &self,
        shared: &SharedContext,
        state: &RunState,
    ) -> Result<(), PipelineError> {
        let (owner_id, item_id, snapshot) = {
            let guard = shared.lock();
            (guard.owner_id.clone(), guard.item_id.clone(), guard.snapshot()?)
        };
        let checkpoint = Checkpoint::new(
            state.completed.clone(),
            state.stage_data.clone(),
            snapshot,
        );
        self.store.save(&owner_id, &item_id, checkpoint).await
    }

    fn unwrap_shared(shared: SharedContext) -> RunContext {
        match Arc::try_unwrap(shared) {
            Ok(mutex) => mutex.into_inner(),
            Err(arc) => arc.lock().clone(),
        }
    }
}
