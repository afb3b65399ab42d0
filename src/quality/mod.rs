//! Source quality scoring.
//!
//! Candidates returned by search are scored along five weighted
//! [`Dimension`]s by the [`QualityEvaluator`]. The result is an immutable
//! [`QualityScore`] used to filter and rank sources before synthesis.

pub mod dimension;
pub mod evaluator;
pub mod score;
pub mod source;

pub use dimension::Dimension;
pub use evaluator::QualityEvaluator;
pub use score::QualityScore;
pub use source::{CandidateSource, Evaluable};
