//! Conversation transcript types

use serde::{Deserialize, Serialize};

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One finalized message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered dialogue history.
///
/// Turns are only ever appended or truncated from the end, so a length
/// recorded before a round-trip is a valid rollback point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    id: String,
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            turns: Vec::new(),
        }
    }

    /// Start from an existing history (e.g. restored by the caller)
    pub fn with_turns(turns: Vec<Turn>) -> Self {
        Self {
            turns,
            ..Self::new()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drop every turn at or after `len`
    pub fn truncate(&mut self, len: usize) {
        self.turns.truncate(len);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Assistant reply under construction.
///
/// Owned by the controller for the duration of one round-trip. Content only
/// grows; [`PendingReply::finish`] turns it into an immutable [`Turn`].
#[derive(Debug, Default)]
pub struct PendingReply {
    content: String,
    deltas: usize,
}

impl PendingReply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, delta: &str) {
        self.content.push_str(delta);
        self.deltas += 1;
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of deltas folded in so far
    pub fn deltas(&self) -> usize {
        self.deltas
    }

    pub fn finish(self) -> Turn {
        Turn::assistant(self.content)
    }
}
