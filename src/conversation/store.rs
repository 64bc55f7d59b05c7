//! Store trait — the operations a conversation backend supports.
//!
//! Stores are keyed by session id and are append-only: there is no way to
//! edit or remove a turn once recorded. Implementations must be
//! `Send + Sync`; they are shared as `Arc<dyn ConversationStore>` across
//! request handlers.

use super::Turn;

/// Session used when a caller does not name one.
pub const DEFAULT_SESSION: &str = "default";

pub trait ConversationStore: Send + Sync {
    /// Unique type name for this store (e.g. `"in_memory"`).
    fn store_type(&self) -> &str;

    /// Append `turn` to the end of `session`'s transcript.
    /// No validation is performed on the content.
    fn record(&self, session: &str, turn: Turn);

    /// Append a user turn and its reply as one unit, so concurrent writers
    /// cannot land anything between them.
    fn record_exchange(&self, session: &str, user: Turn, assistant: Turn);

    /// Full transcript of `session` in insertion order. Unknown sessions are empty.
    fn snapshot(&self, session: &str) -> Vec<Turn>;

    /// Number of turns recorded for `session`.
    fn len(&self, session: &str) -> usize {
        self.snapshot(session).len()
    }

    /// Ids of every session holding at least one turn, sorted.
    fn sessions(&self) -> Vec<String>;
}
