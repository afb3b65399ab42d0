//! Scored axes of source quality and their fixed weights.

use serde::{Deserialize, Serialize};

/// One scored axis of source quality.
///
/// Variants are declared in evaluation order; [`Dimension::ALL`] follows
/// the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Trustworthiness of the publishing domain.
    Authority,
    /// Word overlap between the query and the source.
    Relevance,
    /// Length and substance of the source text.
    ContentQuality,
    /// Freshness of the source.
    Recency,
    /// Coverage of the query's facets.
    Completeness,
}

/// Weight table in [`Dimension::ALL`] order.
const WEIGHTS: [f64; 5] = [0.30, 0.40, 0.20, 0.05, 0.05];

const fn weight_sum() -> f64 {
    let mut sum = 0.0;
    let mut i = 0;
    while i < WEIGHTS.len() {
        sum += WEIGHTS[i];
        i += 1;
    }
    sum
}

// Weights must sum to exactly one (within float rounding).
const _: () = {
    let drift = weight_sum() - 1.0;
    assert!(drift < 1e-9 && drift > -1e-9, "dimension weights must sum to 1.0");
};

impl Dimension {
    /// Every dimension, in evaluation order.
    pub const ALL: [Self; 5] = [
        Self::Authority,
        Self::Relevance,
        Self::ContentQuality,
        Self::Recency,
        Self::Completeness,
    ];

    /// Weight of this dimension in the overall score.
    #[must_use]
    pub const fn weight(self) -> f64 {
        WEIGHTS[self as usize]
    }

    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authority => "authority",
            Self::Relevance => "relevance",
            Self::ContentQuality => "content_quality",
            Self::Recency => "recency",
            Self::Completeness => "completeness",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
