//! `in_memory` store — one `Vec<Turn>` per session behind a mutex.
//!
//! Lives for the life of the process; nothing is written to disk.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::store::ConversationStore;
use super::Turn;

#[derive(Default)]
pub struct InMemoryStore {
    sessions: Mutex<HashMap<String, Vec<Turn>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means another thread panicked mid-append; the
    // map itself is still consistent, so keep serving it.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Turn>>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ConversationStore for InMemoryStore {
    fn store_type(&self) -> &str {
        "in_memory"
    }

    fn record(&self, session: &str, turn: Turn) {
        self.lock().entry(session.to_string()).or_default().push(turn);
    }

    fn record_exchange(&self, session: &str, user: Turn, assistant: Turn) {
        let mut sessions = self.lock();
        let turns = sessions.entry(session.to_string()).or_default();
        turns.push(user);
        turns.push(assistant);
    }

    fn snapshot(&self, session: &str) -> Vec<Turn> {
        self.lock().get(session).cloned().unwrap_or_default()
    }

    fn len(&self, session: &str) -> usize {
        self.lock().get(session).map_or(0, Vec::len)
    }

    fn sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, turns)| !turns.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}
