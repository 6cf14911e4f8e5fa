//! Request lifecycle deadlines: acceptance, per-message, heartbeat.
//!
//! `Lifecycle` holds deadlines as plain instants so the transport's run
//! loop can feed a single `sleep_until` select arm from
//! [`Lifecycle::next_deadline`] and drain whatever fired with
//! [`Lifecycle::expire`]. Nothing here sleeps, which keeps the timer rules
//! testable without a runtime.

use super::Timeouts;
use std::collections::{HashMap, VecDeque};
use tokio::time::Instant;

/// A deadline that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    /// No inbound frame arrived within the acceptance window.
    Acceptance,
    /// No response correlated to this outbound message id arrived in time.
    Message(String),
    /// An in-progress response stalled between chunks.
    Heartbeat,
}

#[derive(Debug)]
pub struct Lifecycle {
    timeouts: Timeouts,
    acceptance: Option<Instant>,
    heartbeat: Option<Instant>,
    pending: HashMap<String, Instant>,
    send_order: VecDeque<String>,
}

impl Lifecycle {
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            timeouts,
            acceptance: None,
            heartbeat: None,
            pending: HashMap::new(),
            send_order: VecDeque::new(),
        }
    }

    /// Starts the acceptance window. Called once, on connect.
    pub fn arm_acceptance(&mut self) {
        self.acceptance = Some(Instant::now() + self.timeouts.acceptance);
    }

    /// Any inbound frame cancels the acceptance window for good.
    pub fn content_received(&mut self) {
        self.acceptance = None;
    }

    pub fn acceptance_armed(&self) -> bool {
        self.acceptance.is_some()
    }

    /// Tracks one outbound message. Re-tracking an id replaces its deadline,
    /// so at most one pending entry exists per id.
    pub fn track_message(&mut self, id: &str) {
        if self.pending.insert(id.to_string(), Instant::now() + self.timeouts.per_message).is_none() {
            self.send_order.push_back(id.to_string());
        }
    }

    /// Cancels the timer for a specific message id.
    pub fn resolve_message(&mut self, id: &str) -> bool {
        self.send_order.retain(|pending| pending != id);
        self.pending.remove(id).is_some()
    }

    /// Cancels the oldest tracked message; used by the streaming transport,
    /// whose wire carries no correlation ids, so the first content of a
    /// response answers the oldest outstanding send.
    pub fn resolve_oldest(&mut self) -> Option<String> {
        let id = self.send_order.pop_front()?;
        self.pending.remove(&id);
        Some(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// (Re-)arms the heartbeat; called on every chunk of an open response.
    pub fn arm_heartbeat(&mut self) {
        self.heartbeat = Some(Instant::now() + self.timeouts.heartbeat);
    }

    /// Cancels the heartbeat when a response completes.
    pub fn clear_heartbeat(&mut self) {
        self.heartbeat = None;
    }

    pub fn heartbeat_armed(&self) -> bool {
        self.heartbeat.is_some()
    }

    /// The earliest armed deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        let mut next: Option<Instant> = None;
        for deadline in self
            .acceptance
            .iter()
            .chain(self.heartbeat.iter())
            .chain(self.pending.values())
        {
            next = Some(match next {
                Some(current) => current.min(*deadline),
                None => *deadline,
            });
        }
        next
    }

    /// Removes and returns every deadline at or before `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<Expiry> {
        let mut fired = Vec::new();

        if self.acceptance.is_some_and(|deadline| deadline <= now) {
            self.acceptance = None;
            fired.push(Expiry::Acceptance);
        }

        let mut expired_ids: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        expired_ids.sort();
        for id in expired_ids {
            self.resolve_message(&id);
            fired.push(Expiry::Message(id));
        }

        if self.heartbeat.is_some_and(|deadline| deadline <= now) {
            self.heartbeat = None;
            fired.push(Expiry::Heartbeat);
        }

        fired
    }

    /// Drops every deadline so nothing stale fires against a later session.
    pub fn reset(&mut self) {
        self.acceptance = None;
        self.heartbeat = None;
        self.pending.clear();
        self.send_order.clear();
    }
}
