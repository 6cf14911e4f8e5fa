//! Bounded, ordered turn history for the stateless transport.
//!
//! The streaming transport holds session state server-side and never
//! touches this.

use crate::client::wire::{Content, Part};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAP: usize = 20;

/// A capped FIFO of role-attributed turns. Appending beyond the cap evicts
/// the oldest turn.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<Content>,
    cap: usize,
}

impl ConversationHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    pub fn append_user_turn(&mut self, parts: Vec<Part>) {
        self.push(Content::user(parts));
    }

    pub fn append_model_turn(&mut self, parts: Vec<Part>) {
        self.push(Content::model(parts));
    }

    pub fn append_tool_turn(&mut self, parts: Vec<Part>) {
        self.push(Content::tool(parts));
    }

    /// A read-only copy used to build one request body.
    pub fn snapshot(&self) -> Vec<Content> {
        self.turns.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn push(&mut self, turn: Content) {
        if self.turns.len() == self.cap {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}
