//! Process-local fallback view of started and revoked sessions.
//!
//! Mirrors only the explicit start/revoke calls made in this process and has
//! no notion of expiry. It is consulted only while the durable store cannot
//! be reached, and it starts empty on every restart.

use parking_lot::Mutex;
use std::collections::HashSet;

#[derive(Debug, Default)]
struct SessionSets {
    active: HashSet<String>,
    revoked: HashSet<String>,
    // Revoked here but not yet written to the durable store.
    unsynced: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct VolatileSessionStore {
    // One lock over both sets so revoke moves an id atomically.
    inner: Mutex<SessionSets>,
}

impl VolatileSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the id was already tracked as active.
    pub fn start(&self, session_id: &str) -> bool {
        self.inner.lock().active.insert(session_id.to_string())
    }

    /// Forgets an id started by this process without marking it revoked.
    pub fn discard(&self, session_id: &str) {
        self.inner.lock().active.remove(session_id);
    }

    pub fn revoke(&self, session_id: &str) {
        let mut sets = self.inner.lock();
        sets.active.remove(session_id);
        sets.revoked.insert(session_id.to_string());
    }

    pub fn is_revoked(&self, session_id: &str) -> bool {
        self.inner.lock().revoked.contains(session_id)
    }

    pub fn mark_unsynced(&self, session_id: &str) {
        self.inner.lock().unsynced.insert(session_id.to_string());
    }

    pub fn is_unsynced(&self, session_id: &str) -> bool {
        self.inner.lock().unsynced.contains(session_id)
    }

    pub fn mark_synced(&self, session_id: &str) {
        self.inner.lock().unsynced.remove(session_id);
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        let sets = self.inner.lock();
        sets.active.contains(session_id) && !sets.revoked.contains(session_id)
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active.len()
    }
}
