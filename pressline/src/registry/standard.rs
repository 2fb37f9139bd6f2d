//! The canonical seven-group topology.
//!
//! Stage implementations are injected once, up front, through
//! [`StageBindings`]; nothing is resolved lazily at call time.

use super::{StageGroup, StageRegistry};
use crate::context::RunStatus;
use crate::errors::PipelineError;
use crate::quality::SmartReviewStage;
use crate::stages::{NoOpStageExec, Stage, StageExec};
use std::sync::Arc;

/// Injected implementations for the canonical stages.
///
/// Every binding defaults to a no-op (smart-review defaults to the built-in
/// [`SmartReviewStage`]), so callers wire only the stages they care about.
#[derive(Debug, Clone)]
pub struct StageBindings {
    /// Duplicate-topic check, validation group.
    pub dedup_check: Arc<dyn StageExec>,
    /// Research lookup, enrichment group.
    pub research: Arc<dyn StageExec>,
    /// Author-identity matching, enrichment group.
    pub author_match: Arc<dyn StageExec>,
    /// Content generation, generation group.
    pub generate_content: Arc<dyn StageExec>,
    /// Image generation, generation group.
    pub generate_images: Arc<dyn StageExec>,
    /// Schema/markup injection, enhancement group.
    pub schema_markup: Arc<dyn StageExec>,
    /// Spinning/humanizing, enhancement group.
    pub humanize: Arc<dyn StageExec>,
    /// Quality scoring, quality-gate group.
    pub quality_score: Arc<dyn StageExec>,
    /// Review decision, quality-gate group.
    pub smart_review: Arc<dyn StageExec>,
    /// SEO optimization, optimization group.
    pub seo_optimize: Arc<dyn StageExec>,
    /// A/B test setup, optimization group.
    pub ab_test: Arc<dyn StageExec>,
    /// Primary publish, publish group.
    pub publish: Arc<dyn StageExec>,
    /// Multi-destination publish, publish group.
    pub multi_site_publish: Arc<dyn StageExec>,
}

impl Default for StageBindings {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! binding_setter {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[must_use]
        pub fn $name(mut self, exec: Arc<dyn StageExec>) -> Self {
            self.$name = exec;
            self
        }
    };
}

impl StageBindings {
    /// Creates bindings with no-op defaults.
    #[must_use]
    pub fn new() -> Self {
        let noop: Arc<dyn StageExec> = Arc::new(NoOpStageExec);
        Self {
            dedup_check: noop.clone(),
            research: noop.clone(),
            author_match: noop.clone(),
            generate_content: noop.clone(),
            generate_images: noop.clone(),
            schema_markup: noop.clone(),
            humanize: noop.clone(),
            quality_score: noop.clone(),
            smart_review: Arc::new(SmartReviewStage),
            seo_optimize: noop.clone(),
            ab_test: noop.clone(),
            publish: noop.clone(),
            multi_site_publish: noop,
        }
    }

    binding_setter!(
        /// Sets the dedup-check implementation.
        dedup_check
    );
    binding_setter!(
        /// Sets the research implementation.
        research
    );
    binding_setter!(
        /// Sets the author-match implementation.
        author_match
    );
    binding_setter!(
        /// Sets the content-generation implementation.
        generate_content
    );
    binding_setter!(
        /// Sets the image-generation implementation.
        generate_images
    );
    binding_setter!(
        /// Sets the schema-markup implementation.
        schema_markup
    );
    binding_setter!(
        /// Sets the humanize implementation.
        humanize
    );
    binding_setter!(
        /// Sets the quality-scoring implementation.
        quality_score
    );
    binding_setter!(
        /// Sets the smart-review implementation.
        smart_review
    );
    binding_setter!(
        /// Sets the SEO-optimization implementation.
        seo_optimize
    );
    binding_setter!(
        /// Sets the A/B-test implementation.
        ab_test
    );
    binding_setter!(
        /// Sets the publish implementation.
        publish
    );
    binding_setter!(
        /// Sets the multi-site-publish implementation.
        multi_site_publish
    );
}

/// Builds the canonical registry:
/// validation → enrichment → generation → enhancement → quality gate →
/// optimization → publish. Enrichment and enhancement run parallel; all
/// other groups are strictly sequential.
pub fn standard_registry(bindings: StageBindings) -> Result<StageRegistry, PipelineError> {
    StageRegistry::new(vec![
        StageGroup::sequential(
            "validation",
            "Validation",
            RunStatus::Researching,
            vec![Stage::required(
                "dedup-check",
                "Duplicate Check",
                bindings.dedup_check,
            )],
        ),
        StageGroup::parallel(
            "enrichment",
            "Enrichment",
            RunStatus::Researching,
            vec![
                Stage::optional("research", "Research", bindings.research),
                Stage::optional("author-match", "Author Match", bindings.author_match),
            ],
        ),
        StageGroup::sequential(
            "generation",
            "Generation",
            RunStatus::Generating,
            vec![
                Stage::required(
                    "generate-content",
                    "Generate Content",
                    bindings.generate_content,
                ),
                Stage::optional("generate-images", "Generate Images", bindings.generate_images)
                    .with_condition(|_ctx, config| config.images_enabled),
            ],
        ),
        StageGroup::parallel(
            "enhancement",
            "Enhancement",
            RunStatus::Generating,
            vec![
                Stage::optional("schema-markup", "Schema Markup", bindings.schema_markup)
                    .with_condition(|_ctx, config| config.schema_markup_enabled),
                Stage::optional("humanize", "Humanize", bindings.humanize)
                    .with_condition(|_ctx, config| config.humanize_enabled),
            ],
        ),
        StageGroup::sequential(
            "quality-gate",
            "Quality Gate",
            RunStatus::Generating,
            vec![
                Stage::required("quality-score", "Quality Score", bindings.quality_score),
                Stage::required("smart-review", "Smart Review", bindings.smart_review),
            ],
        ),
        StageGroup::sequential(
            "optimization",
            "Optimization",
            RunStatus::Publishing,
            vec![
                Stage::optional("seo-optimize", "SEO Optimize", bindings.seo_optimize)
                    .with_condition(|_ctx, config| config.seo_enabled),
                Stage::optional("ab-test", "A/B Test", bindings.ab_test)
                    .with_condition(|_ctx, config| config.ab_testing_enabled),
            ],
        ),
        StageGroup::sequential(
            "publish",
            "Publish",
            RunStatus::Publishing,
            vec![
                Stage::required("publish", "Publish", bindings.publish),
                Stage::optional(
                    "multi-site-publish",
                    "Multi-Site Publish",
                    bindings.multi_site_publish,
                )
                .with_condition(|_ctx, config| config.multi_site_enabled),
            ],
        ),
    ])
}
