//! Error types for the research pipeline.
//!
//! Upstream faults, malformed stage output, aborted stages and
//! cancellation are kept as distinct variants so callers can tell a
//! user-initiated stop from a genuine failure.

use thiserror::Error;

use crate::pipeline::report::ResearchReport;
use crate::pipeline::session::ResearchState;
use crate::pipeline::stage::StageName;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors produced by agents, collaborators and the orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The completion or search service returned a non-success status,
    /// or the transport failed (timeout, connection reset).
    #[error("upstream call failed{}: {message}", status_suffix(.status))]
    AgentCall {
        /// Human-readable failure description.
        message: String,
        /// HTTP status code, when the upstream answered.
        status: Option<u16>,
        /// Raw response body, when available.
        body: Option<String>,
    },

    /// Structured agent output could not be parsed.
    #[error("failed to parse {stage} output: {message}")]
    StageParse {
        /// Stage whose output was malformed.
        stage: StageName,
        /// Parse failure description.
        message: String,
        /// The raw content that failed to parse.
        content: String,
    },

    /// A stage configured to abort failed; the session is `Failed`.
    #[error("stage '{stage}' aborted the pipeline: {source}")]
    Orchestration {
        /// Stage that failed.
        stage: StageName,
        /// The underlying failure.
        #[source]
        source: Box<Self>,
        /// Outputs produced before the failing stage.
        partial: Box<ResearchReport>,
    },

    /// The session was cancelled externally.
    #[error("research session cancelled")]
    Cancelled {
        /// Outputs produced before cancellation, when raised by the orchestrator.
        partial: Option<Box<ResearchReport>>,
    },

    /// A session was asked to make an illegal state transition.
    #[error("invalid session transition {from} -> {to}")]
    InvalidTransition {
        /// State the session was in.
        from: ResearchState,
        /// Requested state.
        to: ResearchState,
    },

    /// The query was rejected before a session started.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Reason for rejection.
        message: String,
    },

    /// No API key was configured.
    #[error("API key not configured (set RESEARCH_API_KEY or OPENAI_API_KEY)")]
    ApiKeyMissing,

    /// The configured provider name is unknown.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// The provider name that was requested.
        name: String,
    },

    /// Configuration was inconsistent or could not be loaded.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl PipelineError {
    /// Creates an [`PipelineError::AgentCall`] without status or body.
    pub fn call(message: impl Into<String>) -> Self {
        Self::AgentCall {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Creates a [`PipelineError::Cancelled`] with no partial results.
    #[must_use]
    pub const fn cancelled() -> Self {
        Self::Cancelled { partial: None }
    }

    /// Returns `true` for upstream call failures.
    #[must_use]
    pub const fn is_call_error(&self) -> bool {
        matches!(self, Self::AgentCall { .. })
    }

    /// Returns `true` for cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Partial results carried by an aborted or cancelled session.
    #[must_use]
    pub fn partial(&self) -> Option<&ResearchReport> {
        match self {
            Self::Orchestration { partial, .. } => Some(partial),
            Self::Cancelled { partial } => partial.as_deref(),
            _ => None,
        }
    }
}
