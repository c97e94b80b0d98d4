use super::{Role, Turn};

/// Simple helper struct to build and reuse a conversation history.
/// This wraps a `Vec<Turn>` and provides builder-style helpers.
///
/// Invariant: the order of turns is preserved (push order == send order).
#[derive(Debug, Default, Clone)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    /// Create empty history.
    pub fn new() -> Self { Self { turns: Vec::new() } }

    /// Current length.
    pub fn len(&self) -> usize { self.turns.len() }
    /// Is empty.
    pub fn is_empty(&self) -> bool { self.turns.is_empty() }

    pub fn as_slice(&self) -> &[Turn] { &self.turns }

    /// Push raw turn.
    pub fn push(&mut self, turn: Turn) { self.turns.push(turn); }

    pub fn extend_from_slice(&mut self, turns: &[Turn]) { self.turns.extend_from_slice(turns); }

    /// Add user turn.
    pub fn add_user<S: AsRef<str>>(&mut self, content: S) -> &mut Self {
        self.turns.push(Turn::user(content.as_ref()));
        self
    }

    /// Add model turn.
    pub fn add_model<S: AsRef<str>>(&mut self, content: S) -> &mut Self {
        self.turns.push(Turn::model(content.as_ref()));
        self
    }

    /// Role of the most recent turn, if any.
    pub fn last_role(&self) -> Option<Role> { self.turns.last().map(|t| t.role) }
}
