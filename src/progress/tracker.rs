//! Per-session progress tracking.
//!
//! Overall progress assumes at most one step is in flight:
//! `(completed steps other than the current one + current progress) / total`.
//! Stages run strictly in sequence, so this holds for every session the
//! orchestrator drives.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::time::Instant;
use tracing::trace;
use uuid::Uuid;

use super::EventSender;
use super::event::{ProgressEvent, ProgressUpdate};
use crate::pipeline::session::ResearchState;

/// Tracks step and overall progress for one session and emits events.
///
/// Every emitted event is appended to [`ProgressTracker::history`] and
/// forwarded to the sink, in call order.
#[derive(Debug)]
pub struct ProgressTracker {
    session_id: Uuid,
    total_steps: usize,
    step_progress: BTreeMap<String, f64>,
    current_step: usize,
    overall_progress: f64,
    finished: bool,
    started: Instant,
    history: Vec<ProgressEvent>,
    sink: Option<EventSender>,
}

/// Resumable view of a tracker's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Session being tracked.
    pub session_id: Uuid,
    /// Number of steps in the session.
    pub total_steps: usize,
    /// Number of steps completed.
    pub current_step: usize,
    /// Last recorded progress per step.
    pub steps: BTreeMap<String, f64>,
    /// Last computed overall progress.
    pub overall_progress: f64,
    /// Whether `research_complete` was emitted.
    pub finished: bool,
    /// Events emitted so far.
    pub events_emitted: usize,
}

impl ProgressTracker {
    /// Creates a tracker for `total_steps` steps (at least one).
    #[must_use]
    pub fn new(session_id: Uuid, total_steps: usize, sink: Option<EventSender>) -> Self {
        Self {
            session_id,
            total_steps: total_steps.max(1),
            step_progress: BTreeMap::new(),
            current_step: 0,
            overall_progress: 0.0,
            finished: false,
            started: Instant::now(),
            history: Vec::new(),
            sink,
        }
    }

    /// Records progress for a step and emits a `progress_update`.
    #[allow(clippy::cast_precision_loss)]
    pub fn update_step(
        &mut self,
        name: &str,
        progress: f64,
        message: impl Into<String>,
        state: ResearchState,
        metadata: Map<String, Value>,
    ) -> ProgressUpdate {
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        self.step_progress.insert(name.to_string(), progress);

        let completed = self
            .step_progress
            .iter()
            .filter(|(step, p)| step.as_str() != name && **p >= 1.0)
            .count();
        self.overall_progress =
            ((completed as f64 + progress) / self.total_steps as f64).clamp(0.0, 1.0);

        let update = ProgressUpdate {
            session_id: self.session_id,
            step_name: name.to_string(),
            step_progress: progress,
            overall_progress: self.overall_progress,
            state,
            message: message.into(),
            timestamp: Utc::now(),
            metadata,
        };
        self.emit(ProgressEvent::ProgressUpdate(update.clone()));
        update
    }

    /// Marks a step done; emits `research_complete` after the last one.
    pub fn complete_step(&mut self, name: &str, message: impl Into<String>) -> ProgressUpdate {
        let update = self.update_step(name, 1.0, message, ResearchState::Completed, Map::new());
        self.current_step += 1;
        if self.current_step >= self.total_steps && !self.finished {
            self.finished = true;
            self.emit(ProgressEvent::ResearchComplete {
                session_id: self.session_id,
                elapsed_secs: self.started.elapsed().as_secs_f64(),
                timestamp: Utc::now(),
            });
        }
        update
    }

    /// Resets a step to zero and emits an `error` event.
    ///
    /// Does not advance the current step.
    pub fn fail_step(&mut self, name: &str, error: impl Into<String>) -> ProgressUpdate {
        let error = error.into();
        let update = self.update_step(
            name,
            0.0,
            error.clone(),
            ResearchState::Failed,
            Map::new(),
        );
        self.emit(ProgressEvent::Error {
            session_id: self.session_id,
            step_name: name.to_string(),
            message: error,
            timestamp: Utc::now(),
        });
        update
    }

    /// Records a `Cancelled` update at the step's last progress.
    pub fn cancel_step(&mut self, name: &str, message: impl Into<String>) -> ProgressUpdate {
        let progress = self.step_progress.get(name).copied().unwrap_or(0.0);
        self.update_step(
            name,
            progress,
            message,
            ResearchState::Cancelled,
            Map::new(),
        )
    }

    /// Session being tracked.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Last computed overall progress.
    #[must_use]
    pub const fn overall_progress(&self) -> f64 {
        self.overall_progress
    }

    /// Every event emitted so far, in order.
    #[must_use]
    pub fn history(&self) -> &[ProgressEvent] {
        &self.history
    }

    /// Current state for a consumer that joins late.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            session_id: self.session_id,
            total_steps: self.total_steps,
            current_step: self.current_step,
            steps: self.step_progress.clone(),
            overall_progress: self.overall_progress,
            finished: self.finished,
            events_emitted: self.history.len(),
        }
    }

    fn emit(&mut self, event: ProgressEvent) {
        if let Some(sink) = &self.sink
            && sink.send(event.clone()).is_err()
        {
            trace!(session_id = %self.session_id, "progress receiver dropped");
        }
        self.history.push(event);
    }
}
