//! Shared lookup of active sessions.
//!
//! Read-mostly: progress consumers list and inspect sessions while each
//! orchestrator run updates only its own entry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::session::SessionSnapshot;

#[derive(Debug)]
struct Entry {
    snapshot: SessionSnapshot,
    cancel: CancellationToken,
}

/// Registry of sessions that have not reached a terminal state.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session with the token that cancels it.
    pub fn register(&self, snapshot: SessionSnapshot, cancel: CancellationToken) {
        self.inner
            .write()
            .insert(snapshot.id, Entry { snapshot, cancel });
    }

    /// Adds a session that is removed again when the returned guard drops.
    ///
    /// A run holds the guard for its whole lifetime, so a run future that
    /// is dropped before reaching a terminal state still leaves the
    /// registry.
    #[must_use = "dropping the guard deregisters the session"]
    pub fn register_scoped(
        &self,
        snapshot: SessionSnapshot,
        cancel: CancellationToken,
    ) -> Registration {
        let id = snapshot.id;
        self.register(snapshot, cancel);
        Registration {
            registry: self.clone(),
            id,
        }
    }

    /// Replaces the stored snapshot. Unknown ids are ignored.
    pub fn update(&self, snapshot: SessionSnapshot) {
        if let Some(entry) = self.inner.write().get_mut(&snapshot.id) {
            entry.snapshot = snapshot;
        }
    }

    /// Drops a session, returning its last snapshot.
    pub fn remove(&self, id: Uuid) -> Option<SessionSnapshot> {
        self.inner.write().remove(&id).map(|e| e.snapshot)
    }

    /// Latest snapshot of a session.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<SessionSnapshot> {
        self.inner.read().get(&id).map(|e| e.snapshot.clone())
    }

    /// All active sessions, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<SessionSnapshot> {
        let mut sessions: Vec<SessionSnapshot> = self
            .inner
            .read()
            .values()
            .map(|e| e.snapshot.clone())
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }

    /// Signals cancellation to a running session.
    ///
    /// Returns `false` if the id is not active.
    pub fn cancel(&self, id: Uuid) -> bool {
        self.inner.read().get(&id).is_some_and(|e| {
            e.cancel.cancel();
            true
        })
    }

    /// Number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether no session is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Keeps one session registered until dropped.
#[derive(Debug)]
pub struct Registration {
    registry: SessionRegistry,
    id: Uuid,
}

impl Registration {
    /// Id of the registered session.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
