//! Pipeline stages and their failure policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One phase of the research pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    /// Decompose the query into sub-questions.
    Plan,
    /// Retrieve, score and rank candidate sources.
    Search,
    /// Write the final report.
    Synthesize,
}

/// Stage sequence used when none is configured.
pub const DEFAULT_STAGES: [StageName; 3] = [StageName::Plan, StageName::Search, StageName::Synthesize];

impl StageName {
    /// Lower-case stage name, also used as the progress step name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Search => "search",
            Self::Synthesize => "synthesize",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plan" => Ok(Self::Plan),
            "search" => Ok(Self::Search),
            "synthesize" | "synthesise" => Ok(Self::Synthesize),
            other => Err(PipelineError::Config {
                message: format!("unknown stage '{other}'"),
            }),
        }
    }
}

/// What the orchestrator does when a stage's upstream call fails.
///
/// Malformed structured output always falls back regardless of policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Substitute deterministic default output and continue.
    Fallback,
    /// Fail the session and return partial results.
    #[default]
    Abort,
}
