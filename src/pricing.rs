//! Per-model pricing used to convert token usage into cost.
//!
//! Prices change independently of pipeline logic, so the table is plain
//! data: it can be loaded from a JSON file and swapped at configuration
//! time.
//!
//! ```json
//! {
//!   "models": [
//!     { "pattern": "mini", "per_million": 0.6 },
//!     { "pattern": "large", "per_million": 1.0 }
//!   ],
//!   "default_per_million": 2.5
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agent::message::TokenUsage;
use crate::error::{PipelineError, Result};

/// Fallback rate when no entry matches a model id.
const DEFAULT_PER_MILLION: f64 = 2.5;

/// A single pricing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRate {
    /// Exact model id, or a coarse size token matched against whole
    /// segments of the id.
    pub pattern: String,
    /// Price per one million total tokens.
    pub per_million: f64,
}

/// Ordered pricing rules with a default rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTable {
    /// Rules checked in order.
    #[serde(default)]
    pub models: Vec<ModelRate>,
    /// Rate applied when no rule matches.
    #[serde(default = "default_per_million")]
    pub default_per_million: f64,
}

const fn default_per_million() -> f64 {
    DEFAULT_PER_MILLION
}

impl Default for PricingTable {
    fn default() -> Self {
        let rate = |pattern: &str, per_million: f64| ModelRate {
            pattern: pattern.to_string(),
            per_million,
        };
        Self {
            models: vec![
                rate("nano", 0.10),
                rate("mini", 0.60),
                rate("small", 0.20),
                rate("medium", 0.60),
                rate("large", 1.00),
                rate("huge", 5.00),
            ],
            default_per_million: DEFAULT_PER_MILLION,
        }
    }
}

impl PricingTable {
    /// Loads a pricing table from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the file cannot be read or parsed,
    /// or if any rate is negative.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::Config {
            message: format!("failed to read pricing file {}: {e}", path.display()),
        })?;
        let table: Self = serde_json::from_str(&raw).map_err(|e| PipelineError::Config {
            message: format!("failed to parse pricing file {}: {e}", path.display()),
        })?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        if self.default_per_million < 0.0 || self.models.iter().any(|m| m.per_million < 0.0) {
            return Err(PipelineError::Config {
                message: "pricing rates must be non-negative".to_string(),
            });
        }
        Ok(())
    }

    /// Rate per million tokens for a model id.
    ///
    /// An exact id match wins; otherwise the first rule whose pattern
    /// occurs in the id as whole segments; otherwise the default rate.
    ///
    /// Segments are separated by `-`, `_`, `.`, `/` or `:`, so `mini`
    /// prices `gpt-4o-mini` but not `gemini-pro`.
    #[must_use]
    pub fn rate_for(&self, model: &str) -> f64 {
        let model = model.to_lowercase();
        self.models
            .iter()
            .find(|m| m.pattern.to_lowercase() == model)
            .or_else(|| {
                self.models
                    .iter()
                    .find(|m| contains_segment(&model, &m.pattern.to_lowercase()))
            })
            .map_or(self.default_per_million, |m| m.per_million)
    }

    /// Cost of a completion for the given model.
    #[must_use]
    pub fn cost(&self, model: &str, usage: &TokenUsage) -> f64 {
        f64::from(usage.total_tokens) * self.rate_for(model) / 1_000_000.0
    }
}

const fn is_separator(c: char) -> bool {
    matches!(c, '-' | '_' | '.' | '/' | ':')
}

/// Whether `needle` occurs in `haystack` bounded by separators or the ends.
fn contains_segment(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        before.is_none_or(is_separator) && after.is_none_or(is_separator)
    })
}
