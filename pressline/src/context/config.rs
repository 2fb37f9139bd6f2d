//! Campaign configuration and run input descriptors.

use crate::quality::ReviewThresholds;
use serde::{Deserialize, Serialize};

/// Campaign-level settings that drive stage applicability.
///
/// Stage conditions read the feature toggles; the quality gate reads the
/// review thresholds. The config is immutable for the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Unique campaign id. Checkpoints are keyed by this as the owner id.
    pub id: String,
    /// Whether the image-generation stage applies.
    #[serde(default)]
    pub images_enabled: bool,
    /// Whether the humanize/spin stage applies.
    #[serde(default)]
    pub humanize_enabled: bool,
    /// Whether the schema-markup stage applies.
    #[serde(default)]
    pub schema_markup_enabled: bool,
    /// Whether the SEO-optimization stage applies.
    #[serde(default)]
    pub seo_enabled: bool,
    /// Whether the A/B-test stage applies.
    #[serde(default)]
    pub ab_testing_enabled: bool,
    /// Whether the multi-site publish stage applies.
    #[serde(default)]
    pub multi_site_enabled: bool,
    /// Thresholds consumed by the quality-gate review decision.
    #[serde(default)]
    pub review: ReviewThresholds,
}

impl CampaignConfig {
    /// Creates a config with all optional features disabled.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            images_enabled: false,
            humanize_enabled: false,
            schema_markup_enabled: false,
            seo_enabled: false,
            ab_testing_enabled: false,
            multi_site_enabled: false,
            review: ReviewThresholds::default(),
        }
    }

    /// Enables every optional feature toggle.
    #[must_use]
    pub fn with_all_features(mut self) -> Self {
        self.images_enabled = true;
        self.humanize_enabled = true;
        self.schema_markup_enabled = true;
        self.seo_enabled = true;
        self.ab_testing_enabled = true;
        self.multi_site_enabled = true;
        self
    }

    /// Sets the review thresholds.
    #[must_use]
    pub fn with_review(mut self, review: ReviewThresholds) -> Self {
        self.review = review;
        self
    }
}

/// The source item a run processes: one topic destined for one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    /// Unique item id within the owning campaign.
    pub id: String,
    /// The topic or working title.
    pub topic: String,
    /// Target keywords, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl SourceItem {
    /// Creates a new source item.
    #[must_use]
    pub fn new(id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            keywords: Vec::new(),
        }
    }

    /// Sets the target keywords.
    #[must_use]
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }
}

/// Descriptor of the site a run publishes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSite {
    /// Unique site id.
    pub id: String,
    /// Human-readable site name.
    pub name: String,
    /// Base URL of the site.
    pub base_url: String,
}

impl TargetSite {
    /// Creates a new target-site descriptor.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_url: base_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_off() {
        let config = CampaignConfig::new("campaign-1");
        assert!(!config.images_enabled);
        assert!(!config.multi_site_enabled);
    }

    #[test]
    fn test_config_with_all_features() {
        let config = CampaignConfig::new("campaign-1").with_all_features();
        assert!(config.images_enabled);
        assert!(config.humanize_enabled);
        assert!(config.schema_markup_enabled);
        assert!(config.seo_enabled);
        assert!(config.ab_testing_enabled);
        assert!(config.multi_site_enabled);
    }

    #[test]
    fn test_config_deserialize_missing_toggles() {
        let config: CampaignConfig = serde_json::from_str(r#"{"id": "c1"}"#).unwrap();
        assert_eq!(config.id, "c1");
        assert!(!config.seo_enabled);
    }

    #[test]
    fn test_source_item_builder() {
        let item = SourceItem::new("item-1", "Rust pipelines")
            .with_keywords(vec!["rust".to_string(), "pipeline".to_string()]);
        assert_eq!(item.keywords.len(), 2);
    }
}
