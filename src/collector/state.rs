//! Collector-owned mutable state
//!
//! Everything a collector mutates lives in one [`CollectorState`] so a single
//! lock serializes `track`, timer callbacks and lifecycle flushes.

use crate::collector::session::Session;
use crate::schema::Event;
use std::collections::HashSet;

/// Ordered buffer of events awaiting delivery
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<Event>,
}

impl EventQueue {
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Empty the queue, returning everything it held in append order
    pub fn drain_all(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Put a failed batch back ahead of anything queued since it was drained
    pub fn requeue_front(&mut self, batch: Vec<Event>) {
        self.events.splice(0..0, batch);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}

/// Names of events already emitted with once semantics.
///
/// Membership only grows for the lifetime of the collector.
#[derive(Debug, Default)]
pub struct OnceRegistry {
    fired: HashSet<String>,
}

impl OnceRegistry {
    /// Record `name`, returning false if it had already fired
    pub fn claim(&mut self, name: &str) -> bool {
        self.fired.insert(name.to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fired.contains(name)
    }
}

/// All state owned by one collector instance
#[derive(Debug, Default)]
pub struct CollectorState {
    pub queue: EventQueue,
    pub once: OnceRegistry,
    /// Set by the first `initialize` call
    pub initialized: bool,
    /// A debounce timer is armed and has not fired yet
    pub timer_pending: bool,
    /// Resolved lazily on first use
    pub session: Option<Session>,
}
