//! Immutable result of a quality evaluation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::dimension::Dimension;

/// Minimum overall score for a high-quality source.
pub const HIGH_QUALITY_OVERALL: f64 = 0.7;
/// Minimum confidence for a high-quality source.
pub const HIGH_QUALITY_CONFIDENCE: f64 = 0.6;
/// Score assumed for any dimension without a computed value.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Weighted quality assessment of one source against one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    overall: f64,
    dimensions: BTreeMap<Dimension, f64>,
    confidence: f64,
    reasoning: Vec<String>,
}

impl QualityScore {
    /// Builds a score from per-dimension values.
    ///
    /// Values are clamped to `[0, 1]`. The overall score is the weighted
    /// sum over all five dimensions, with [`NEUTRAL_SCORE`] standing in
    /// for any dimension missing from `dimensions`.
    #[must_use]
    pub fn from_dimensions(
        dimensions: BTreeMap<Dimension, f64>,
        confidence: f64,
        reasoning: Vec<String>,
    ) -> Self {
        let dimensions: BTreeMap<Dimension, f64> = dimensions
            .into_iter()
            .map(|(d, v)| (d, clamp_unit(v)))
            .collect();
        let overall = Dimension::ALL
            .iter()
            .map(|d| d.weight() * dimensions.get(d).copied().unwrap_or(NEUTRAL_SCORE))
            .sum::<f64>();
        Self {
            overall: clamp_unit(overall),
            dimensions,
            confidence: clamp_unit(confidence),
            reasoning,
        }
    }

    /// Weighted overall score in `[0, 1]`.
    #[must_use]
    pub const fn overall(&self) -> f64 {
        self.overall
    }

    /// Confidence in `[0, 1]`.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Per-dimension scores.
    #[must_use]
    pub const fn dimensions(&self) -> &BTreeMap<Dimension, f64> {
        &self.dimensions
    }

    /// Score for one dimension, neutral when absent.
    #[must_use]
    pub fn dimension(&self, dimension: Dimension) -> f64 {
        self.dimensions
            .get(&dimension)
            .copied()
            .unwrap_or(NEUTRAL_SCORE)
    }

    /// Notes recorded at threshold crossings, in evaluation order.
    #[must_use]
    pub fn reasoning(&self) -> &[String] {
        &self.reasoning
    }

    /// `overall ≥ 0.7` and `confidence ≥ 0.6`.
    #[must_use]
    pub fn is_high_quality(&self) -> bool {
        self.overall >= HIGH_QUALITY_OVERALL && self.confidence >= HIGH_QUALITY_CONFIDENCE
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
