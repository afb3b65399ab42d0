//! Session state machine and the persistence hand-off.
//!
//! A [`Session`] moves `Pending → InProgress → {Completed, Failed,
//! Cancelled}`. Terminal states reject every further transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::report::ResearchReport;
use super::stage::StageName;
use crate::agent::message::TokenUsage;
use crate::error::{PipelineError, Result};

/// Lifecycle state of a session, also carried on progress updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchState {
    /// Created, not yet started.
    Pending,
    /// Stages are running.
    InProgress,
    /// Every stage finished.
    Completed,
    /// A stage configured to abort failed.
    Failed,
    /// Stopped by an external signal.
    Cancelled,
}

impl ResearchState {
    /// Whether no further transition is allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether `self → next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::InProgress | Self::Cancelled),
            Self::InProgress => next.is_terminal(),
            Self::Completed | Self::Failed | Self::Cancelled => false,
        }
    }

    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ResearchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end-to-end pipeline run for a single query.
///
/// Owned exclusively by the orchestrator driving it.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    query: String,
    stages: Vec<StageName>,
    current_stage_index: usize,
    state: ResearchState,
    accumulated_cost: f64,
    usage: TokenUsage,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a pending session with a fresh v4 id.
    pub fn new(query: impl Into<String>, stages: Vec<StageName>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            stages,
            current_stage_index: 0,
            state: ResearchState::Pending,
            accumulated_cost: 0.0,
            usage: TokenUsage::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Session id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The research query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Configured stage sequence.
    #[must_use]
    pub fn stages(&self) -> &[StageName] {
        &self.stages
    }

    /// Index of the stage currently running (or about to run).
    #[must_use]
    pub const fn current_stage_index(&self) -> usize {
        self.current_stage_index
    }

    /// Stage currently running, if any remain.
    #[must_use]
    pub fn current_stage(&self) -> Option<StageName> {
        self.stages.get(self.current_stage_index).copied()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ResearchState {
        self.state
    }

    /// Cost of every agent call made so far.
    #[must_use]
    pub const fn accumulated_cost(&self) -> f64 {
        self.accumulated_cost
    }

    /// Tokens consumed so far.
    #[must_use]
    pub const fn usage(&self) -> TokenUsage {
        self.usage
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTransition`] when the move is not
    /// allowed, including any move out of a terminal state.
    pub fn transition(&mut self, next: ResearchState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Points the session at stage `index`.
    pub fn enter_stage(&mut self, index: usize) {
        self.current_stage_index = index.min(self.stages.len());
        self.updated_at = Utc::now();
    }

    /// Adds the cost and tokens of one agent call.
    pub fn charge(&mut self, cost: f64, usage: &TokenUsage) {
        self.accumulated_cost += cost;
        self.usage.accumulate(usage);
        self.updated_at = Utc::now();
    }

    /// Serializable copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            query: self.query.clone(),
            stages: self.stages.clone(),
            current_stage_index: self.current_stage_index,
            state: self.state,
            accumulated_cost: self.accumulated_cost,
            usage: self.usage,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Point-in-time view of a [`Session`], handed to the registry and the
/// persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session id.
    pub id: Uuid,
    /// The research query.
    pub query: String,
    /// Configured stage sequence.
    pub stages: Vec<StageName>,
    /// Index of the current stage.
    pub current_stage_index: usize,
    /// Lifecycle state.
    pub state: ResearchState,
    /// Cost accumulated so far.
    pub accumulated_cost: f64,
    /// Tokens consumed so far.
    pub usage: TokenUsage,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last change.
    pub updated_at: DateTime<Utc>,
}

/// Persistence collaborator receiving sessions at their terminal state.
///
/// Store failures are logged by the orchestrator and never fail a run.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a finished session and its report.
    async fn save(&self, snapshot: &SessionSnapshot, report: &ResearchReport) -> Result<()>;
}
