//! Quality-gate decision model.
//!
//! A scoring stage writes a [`QualityAssessment`] into the run context; the
//! smart-review stage maps (score, confidence, thresholds) to one of four
//! decisions. The mapping is a pure function, not a state machine.

use crate::context::{CampaignConfig, SharedContext, TargetSite};
use crate::stages::StageExec;
use anyhow::bail;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A computed quality assessment for generated content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Quality score on a 0-100 scale.
    pub score: f64,
    /// Scorer confidence on a 0-1 scale.
    pub confidence: f64,
    /// Human-readable reasons backing the score.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl QualityAssessment {
    /// Creates a new assessment.
    #[must_use]
    pub fn new(score: f64, confidence: f64) -> Self {
        Self {
            score,
            confidence,
            reasons: Vec::new(),
        }
    }

    /// Attaches reasons to the assessment.
    #[must_use]
    pub fn with_reasons(mut self, reasons: Vec<String>) -> Self {
        self.reasons = reasons;
        self
    }
}

/// Configured thresholds for the review decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewThresholds {
    /// Minimum score for an unconditional approve.
    pub min_score: f64,
    /// Width of the flag band directly below `min_score`.
    pub flag_margin: f64,
    /// Minimum confidence for a retry; below this, low scores go to
    /// manual review instead of burning a regeneration attempt.
    pub min_confidence: f64,
}

impl Default for ReviewThresholds {
    fn default() -> Self {
        Self {
            min_score: 70.0,
            flag_margin: 10.0,
            min_confidence: 0.6,
        }
    }
}

/// The four review outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Proceed to publish unmodified.
    Approve,
    /// Proceed to publish, marked flagged for downstream visibility.
    Flag,
    /// Abort the run so the caller can retry the item.
    Retry,
    /// Proceed to publish as a draft pending manual review.
    Reject,
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "approve"),
            Self::Flag => write!(f, "flag"),
            Self::Retry => write!(f, "retry"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Maps an assessment to a review decision.
///
/// - score at or above `min_score`: approve
/// - score inside the flag band below `min_score`: flag
/// - score below the flag band, confident scorer: retry
/// - score below the flag band, unconfident scorer: reject (manual review)
#[must_use]
pub fn decide(assessment: &QualityAssessment, thresholds: &ReviewThresholds) -> ReviewDecision {
    if assessment.score >= thresholds.min_score {
        ReviewDecision::Approve
    } else if assessment.score >= thresholds.min_score - thresholds.flag_margin {
        ReviewDecision::Flag
    } else if assessment.confidence >= thresholds.min_confidence {
        ReviewDecision::Retry
    } else {
        ReviewDecision::Reject
    }
}

/// The smart-review stage.
///
/// Reads the assessment written by the scoring stage, records the decision,
/// and applies it to the context. A `Retry` decision fails the stage, which
/// the orchestrator treats as a required-stage failure; the preserved
/// checkpoint lets the caller re-attempt the item.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmartReviewStage;

#[async_trait]
impl StageExec for SmartReviewStage {
    async fn execute(
        &self,
        ctx: &SharedContext,
        config: &CampaignConfig,
        _target: &TargetSite,
    ) -> anyhow::Result<()> {
        let assessment = {
            let guard = ctx.lock();
            guard.quality.assessment.clone()
        };
        let Some(assessment) = assessment else {
            bail!("no quality assessment available; scoring stage did not run");
        };

        let decision = decide(&assessment, &config.review);
        {
            let mut guard = ctx.lock();
            guard.quality.decision = Some(decision);
            match decision {
                ReviewDecision::Approve => {}
                ReviewDecision::Flag => guard.quality.flagged = true,
                ReviewDecision::Reject => guard.quality.needs_manual_review = true,
                ReviewDecision::Retry => {}
            }
        }

        if decision == ReviewDecision::Retry {
            let reasons = if assessment.reasons.is_empty() {
                format!("score {:.1} below threshold", assessment.score)
            } else {
                assessment.reasons.join("; ")
            };
            bail!("quality gate requested retry: {reasons}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RunContext, SourceItem};
    use pretty_assertions::assert_eq;

    fn thresholds() -> ReviewThresholds {
        ReviewThresholds {
            min_score: 70.0,
            flag_margin: 10.0,
            min_confidence: 0.6,
        }
    }

    #[test]
    fn test_decide_approve_at_threshold() {
        let a = QualityAssessment::new(70.0, 0.9);
        assert_eq!(decide(&a, &thresholds()), ReviewDecision::Approve);
    }

    #[test]
    fn test_decide_flag_band() {
        let a = QualityAssessment::new(65.0, 0.9);
        assert_eq!(decide(&a, &thresholds()), ReviewDecision::Flag);

        let edge = QualityAssessment::new(60.0, 0.9);
        assert_eq!(decide(&edge, &thresholds()), ReviewDecision::Flag);
    }

    #[test]
    fn test_decide_retry_confident_low_score() {
        let a = QualityAssessment::new(40.0, 0.8);
        assert_eq!(decide(&a, &thresholds()), ReviewDecision::Retry);
    }

    #[test]
    fn test_decide_reject_unconfident_low_score() {
        let a = QualityAssessment::new(40.0, 0.3);
        assert_eq!(decide(&a, &thresholds()), ReviewDecision::Reject);
    }

    fn shared_context(config: &CampaignConfig) -> SharedContext {
        RunContext::new(
            config,
            SourceItem::new("i1", "topic"),
            TargetSite::new("s1", "Site", "https://example.com"),
        )
        .into_shared()
    }

    #[tokio::test]
    async fn test_review_stage_approve_leaves_flags_clear() {
        let config = CampaignConfig::new("c1");
        let ctx = shared_context(&config);
        ctx.lock().quality.assessment = Some(QualityAssessment::new(85.0, 0.9));

        let target = TargetSite::new("s1", "Site", "https://example.com");
        SmartReviewStage.execute(&ctx, &config, &target).await.unwrap();

        let guard = ctx.lock();
        assert_eq!(guard.quality.decision, Some(ReviewDecision::Approve));
        assert!(!guard.quality.flagged);
        assert!(!guard.quality.needs_manual_review);
    }

    #[tokio::test]
    async fn test_review_stage_reject_forces_manual_review() {
        let config = CampaignConfig::new("c1");
        let ctx = shared_context(&config);
        ctx.lock().quality.assessment = Some(QualityAssessment::new(20.0, 0.2));

        let target = TargetSite::new("s1", "Site", "https://example.com");
        SmartReviewStage.execute(&ctx, &config, &target).await.unwrap();

        let guard = ctx.lock();
        assert_eq!(guard.quality.decision, Some(ReviewDecision::Reject));
        assert!(guard.quality.needs_manual_review);
    }

    #[tokio::test]
    async fn test_review_stage_retry_fails_with_reasons() {
        let config = CampaignConfig::new("c1");
        let ctx = shared_context(&config);
        ctx.lock().quality.assessment = Some(
            QualityAssessment::new(30.0, 0.9)
                .with_reasons(vec!["thin content".to_string(), "keyword stuffing".to_string()]),
        );

        let target = TargetSite::new("s1", "Site", "https://example.com");
        let err = SmartReviewStage
            .execute(&ctx, &config, &target)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("thin content"));
        assert_eq!(ctx.lock().quality.decision, Some(ReviewDecision::Retry));
    }

    #[tokio::test]
    async fn test_review_stage_missing_assessment_fails() {
        let config = CampaignConfig::new("c1");
        let ctx = shared_context(&config);
        let target = TargetSite::new("s1", "Site", "https://example.com");

        let err = SmartReviewStage
            .execute(&ctx, &config, &target)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no quality assessment"));
    }
}
