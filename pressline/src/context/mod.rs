//! Context management for pipeline runs.
//!
//! This module provides:
//! - The mutable run context and its per-group sub-structures
//! - Campaign configuration and run input descriptors
//! - The run status enum

mod config;
mod run;
mod status;

pub use config::{CampaignConfig, SourceItem, TargetSite};
pub use run::{
    EnrichmentData, GenerationData, PublishData, QualityData, RunContext, SharedContext,
};
pub use status::RunStatus;
