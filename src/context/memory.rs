//! Bounded conversation memory

use std::collections::VecDeque;

use serde::Serialize;

/// Default number of exchanges kept
pub const DEFAULT_WINDOW: usize = 10;

/// One question and its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

/// The most recent exchanges of a conversation, oldest first
///
/// Holds at most `window` turns; pushing beyond that evicts the oldest.
/// Owned by the caller and passed by `&mut` into the answerer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationMemory {
    turns: VecDeque<Turn>,
    window: usize,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl ConversationMemory {
    /// Create an empty memory keeping `window` exchanges
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Record an exchange, evicting the oldest beyond the window
    pub fn push(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        if self.window == 0 {
            return;
        }

        while self.turns.len() >= self.window {
            self.turns.pop_front();
        }
        self.turns.push_back(Turn {
            user: user.into(),
            assistant: assistant.into(),
        });
    }

    /// Forget every exchange
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Render as `Human: ...` / `AI: ...` lines, empty when there is no history
    #[must_use]
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("Human: {}\nAI: {}", t.user, t.assistant))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
