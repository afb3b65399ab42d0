//! Progress event shapes.
//!
//! Events serialize as JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "progress_update", "session_id": "…", "step_name": "plan",
//!  "step_progress": 1.0, "overall_progress": 0.333, "state": "completed",
//!  "message": "plan completed", "timestamp": "…", "metadata": {}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::pipeline::session::ResearchState;

/// One immutable entry in a session's progress log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Session the update belongs to.
    pub session_id: Uuid,
    /// Step being updated.
    pub step_name: String,
    /// Progress of that step in `[0, 1]`.
    pub step_progress: f64,
    /// Progress of the whole session in `[0, 1]`.
    pub overall_progress: f64,
    /// State of the step.
    pub state: ResearchState,
    /// Human-readable description.
    pub message: String,
    /// When the update was recorded.
    pub timestamp: DateTime<Utc>,
    /// Step-specific details.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Event delivered to the progress sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A step's progress changed.
    ProgressUpdate(ProgressUpdate),
    /// Every step completed.
    ResearchComplete {
        /// Session that finished.
        session_id: Uuid,
        /// Seconds since the tracker was created.
        elapsed_secs: f64,
        /// When the session finished.
        timestamp: DateTime<Utc>,
    },
    /// A step failed. Always preceded by a `Failed` progress update.
    Error {
        /// Session the failure belongs to.
        session_id: Uuid,
        /// Step that failed.
        step_name: String,
        /// Failure description.
        message: String,
        /// When the failure was recorded.
        timestamp: DateTime<Utc>,
    },
}

impl ProgressEvent {
    /// Session the event belongs to.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        match self {
            Self::ProgressUpdate(update) => update.session_id,
            Self::ResearchComplete { session_id, .. } | Self::Error { session_id, .. } => {
                *session_id
            }
        }
    }

    /// The wrapped update, for `progress_update` events.
    #[must_use]
    pub const fn as_update(&self) -> Option<&ProgressUpdate> {
        match self {
            Self::ProgressUpdate(update) => Some(update),
            _ => None,
        }
    }

    /// Wire tag of the event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ProgressUpdate(_) => "progress_update",
            Self::ResearchComplete { .. } => "research_complete",
            Self::Error { .. } => "error",
        }
    }
}
