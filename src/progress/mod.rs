//! Progress tracking and event delivery.
//!
//! A [`ProgressTracker`] per session computes step and overall progress
//! and writes [`ProgressEvent`]s to an unbounded channel in call order.
//! The orchestrator never waits on the consumer.

pub mod event;
pub mod tracker;

use tokio::sync::mpsc;

pub use event::{ProgressEvent, ProgressUpdate};
pub use tracker::{ProgressSnapshot, ProgressTracker};

/// Sending half of a progress channel.
pub type EventSender = mpsc::UnboundedSender<ProgressEvent>;
/// Receiving half of a progress channel.
pub type EventReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Creates a progress channel.
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
