//! # Pressline
//!
//! A staged content-publishing pipeline orchestrator.
//!
//! Pressline drives one source item through an ordered sequence of stage
//! groups — validation, enrichment, generation, enhancement, quality gate,
//! optimization, publish — with:
//!
//! - **Resumable checkpointing**: a failed or interrupted run picks up where
//!   it left off instead of redoing finished work
//! - **Mixed execution modes**: groups run their stages strictly in order or
//!   all concurrently
//! - **Graceful degradation**: optional stages fail without aborting the run
//! - **Injected collaborators**: stage implementations, checkpoint storage,
//!   and progress reporting are all supplied by the caller
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pressline::prelude::*;
//!
//! let registry = standard_registry(
//!     StageBindings::new()
//!         .generate_content(my_generator)
//!         .publish(my_publisher),
//! )?;
//!
//! let orchestrator = Orchestrator::new(registry, store).with_sink(sink);
//! let context = orchestrator.run(&config, item, target, RunOptions::new()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod checkpoint;
pub mod context;
pub mod errors;
pub mod orchestrator;
pub mod progress;
pub mod quality;
pub mod registry;
pub mod stages;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::checkpoint::{
        Checkpoint, CheckpointEntry, CheckpointStore, FileCheckpointStore,
        InMemoryCheckpointStore,
    };
    pub use crate::context::{
        CampaignConfig, RunContext, RunStatus, SharedContext, SourceItem, TargetSite,
    };
    pub use crate::errors::PipelineError;
    pub use crate::orchestrator::{FailedRun, Orchestrator, RunOptions};
    pub use crate::progress::{
        CollectingProgressSink, NoOpProgressSink, ProgressSink, ProgressUpdate,
        TracingProgressSink,
    };
    pub use crate::quality::{
        decide, QualityAssessment, ReviewDecision, ReviewThresholds, SmartReviewStage,
    };
    pub use crate::registry::{standard_registry, StageBindings, StageGroup, StageRegistry};
    pub use crate::stages::{NoOpStageExec, Stage, StageExec, StageResult};
}
