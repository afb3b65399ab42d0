//! Stage outputs and the final research report.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::{ResearchState, Session};
use super::stage::StageName;
use crate::agent::message::TokenUsage;
use crate::quality::{CandidateSource, QualityScore};

/// Planner output: the sub-questions the search stage works through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchPlan {
    /// Focused questions covering the query.
    pub sub_questions: Vec<String>,
    /// Themes the synthesizer should emphasize.
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

/// A retained source with the score that ranked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSource {
    /// The retrieved source.
    pub source: CandidateSource,
    /// Quality against the sub-question that retrieved it.
    pub score: QualityScore,
    /// Sub-question that retrieved the source.
    pub sub_question: String,
}

/// How a stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// The agent's output was used.
    Completed,
    /// A deterministic default replaced the agent's output.
    Fallback,
    /// The stage aborted the session.
    Failed,
    /// The session was cancelled while this stage ran.
    Cancelled,
}

/// Per-stage audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Which stage.
    pub stage: StageName,
    /// How it ended.
    pub outcome: StageOutcome,
    /// Cost of the agent calls made during the stage.
    pub cost: f64,
    /// Tokens consumed during the stage.
    pub usage: TokenUsage,
    /// First error observed, if any.
    pub error: Option<String>,
    /// Wall time spent in the stage.
    pub elapsed: Duration,
}

/// Everything a session produced.
///
/// Returned on success and carried as partial results by aborted or
/// cancelled sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    /// Session id.
    pub session_id: Uuid,
    /// The research query.
    pub query: String,
    /// Final session state.
    pub state: ResearchState,
    /// Markdown report from the synthesize stage.
    pub report: Option<String>,
    /// Plan from the plan stage.
    pub plan: Option<ResearchPlan>,
    /// Ranked sources from the search stage, best first.
    pub sources: Vec<RankedSource>,
    /// One-line description of what the search stage retained.
    pub search_summary: Option<String>,
    /// Audit record for every stage that ran.
    pub stages: Vec<StageRecord>,
    /// Sum of every agent call's cost.
    pub total_cost: f64,
    /// Sum of every agent call's tokens.
    pub usage: TokenUsage,
    /// Overall progress at the end of the session.
    pub overall_progress: f64,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// Wall time of the whole session.
    pub elapsed: Duration,
}

impl ResearchReport {
    /// Empty report for a session that is just starting.
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            session_id: session.id(),
            query: session.query().to_string(),
            state: session.state(),
            report: None,
            plan: None,
            sources: Vec::new(),
            search_summary: None,
            stages: Vec::new(),
            total_cost: 0.0,
            usage: TokenUsage::default(),
            overall_progress: 0.0,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
        }
    }

    /// Record for `stage`, if it ran.
    #[must_use]
    pub fn stage(&self, stage: StageName) -> Option<&StageRecord> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    /// Whether any stage substituted fallback output.
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        self.stages
            .iter()
            .any(|r| r.outcome == StageOutcome::Fallback)
    }
}
