//! Conversation model — turns, and the stores that hold them.
//!
//! A conversation is an ordered, append-only list of [`Turn`]s kept per
//! session. Insertion order is the transcript replayed to the completion
//! service on every exchange.

mod in_memory;
mod store;

pub use in_memory::InMemoryStore;
pub use store::{ConversationStore, DEFAULT_SESSION};

use serde::{Deserialize, Serialize};

/// Who produced a turn. Serialised lowercase, matching the chat wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One message in a conversation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Keep at most the last `limit` turns, dropping further turns from the
/// front until the window starts on a `user` turn.
///
/// Only the transcript sent upstream is windowed; stored turns are never
/// removed. A window never drops the final turn, so the newest user message
/// always reaches the service even when `limit` is `0`.
pub fn window(turns: &[Turn], limit: Option<usize>) -> &[Turn] {
    let Some(limit) = limit else { return turns };
    let limit = limit.max(1);
    let mut start = turns.len().saturating_sub(limit);
    while start + 1 < turns.len() && turns[start].role != Role::User {
        start += 1;
    }
    &turns[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchanges(n: usize) -> Vec<Turn> {
        (0..n)
            .flat_map(|i| [Turn::user(format!("q{i}")), Turn::assistant(format!("a{i}"))])
            .collect()
    }

    #[test]
    fn role_serialises_lowercase() {
        let json = serde_json::to_string(&Turn::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
        let back: Turn = serde_json::from_str(r#"{"role":"assistant","content":"yo"}"#).unwrap();
        assert_eq!(back, Turn::assistant("yo"));
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn window_none_keeps_everything() {
        let mut turns = exchanges(3);
        turns.push(Turn::user("latest"));
        assert_eq!(window(&turns, None).len(), 7);
    }

    #[test]
    fn window_starts_on_user_turn() {
        let mut turns = exchanges(3);
        turns.push(Turn::user("latest"));
        // Last 4 would start on an assistant turn; it gets skipped.
        let w = window(&turns, Some(4));
        assert_eq!(w.len(), 3);
        assert_eq!(w[0], Turn::user("q2"));
        assert_eq!(w.last(), Some(&Turn::user("latest")));
    }

    #[test]
    fn window_never_drops_latest_turn() {
        let mut turns = exchanges(2);
        turns.push(Turn::user("latest"));
        assert_eq!(window(&turns, Some(0)), &[Turn::user("latest")]);
        assert_eq!(window(&turns, Some(1)), &[Turn::user("latest")]);
    }

    #[test]
    fn window_larger_than_transcript() {
        let turns = vec![Turn::user("only")];
        assert_eq!(window(&turns, Some(50)).len(), 1);
    }
}
