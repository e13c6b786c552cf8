//! Confidence levels and thresholds for mapping quality.

use std::collections::BTreeMap;

use bizdiag_model::MappingResult;
use serde::{Deserialize, Serialize};

/// Confidence level categories for mapping quality assessment.
///
/// - `High`: auto-confirmed, no review needed
/// - `Medium`: good match, should be verified
/// - `Low`: weak match, needs confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::High => "high confidence - auto-confirmed",
            Self::Medium => "medium confidence - should review",
            Self::Low => "low confidence - needs confirmation",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Boundaries between confidence levels.
///
/// - Below `low`: never mapped (the confidence floor)
/// - `low` to `medium`: [`ConfidenceLevel::Low`]
/// - `medium` to `high`: [`ConfidenceLevel::Medium`]
/// - At or above `high`: [`ConfidenceLevel::High`], auto-confirmed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    /// Minimum score for an auto-confirmed mapping (default: 0.95).
    pub high: f32,
    /// Minimum score for a medium-quality mapping (default: 0.80).
    pub medium: f32,
    /// Confidence floor (default: 0.60).
    pub low: f32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.95,
            medium: 0.80,
            low: 0.60,
        }
    }
}

impl ConfidenceThresholds {
    /// Thresholds for uploads that should rarely need review.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            high: 0.98,
            medium: 0.90,
            low: 0.75,
        }
    }

    /// Thresholds for exploratory mapping of unfamiliar exports.
    #[must_use]
    pub fn relaxed() -> Self {
        Self {
            high: 0.90,
            medium: 0.70,
            low: 0.50,
        }
    }

    /// Returns `None` if the score is below the floor.
    #[must_use]
    pub fn categorize(&self, confidence: f32) -> Option<ConfidenceLevel> {
        if confidence >= self.high {
            Some(ConfidenceLevel::High)
        } else if confidence >= self.medium {
            Some(ConfidenceLevel::Medium)
        } else if confidence >= self.low {
            Some(ConfidenceLevel::Low)
        } else {
            None
        }
    }

    pub fn is_auto_confirmed(&self, confidence: f32) -> bool {
        confidence >= self.high
    }
}

/// Number of mappings at each confidence level.
#[must_use]
pub fn count_by_level(
    result: &MappingResult,
    thresholds: &ConfidenceThresholds,
) -> BTreeMap<ConfidenceLevel, usize> {
    let mut counts = BTreeMap::new();
    for mapping in &result.mappings {
        if let Some(level) = thresholds.categorize(mapping.confidence) {
            *counts.entry(level).or_insert(0) += 1;
        }
    }
    counts
}
