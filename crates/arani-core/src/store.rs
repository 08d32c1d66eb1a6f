//! In-memory event log mirrored from the backend.
//!
//! Every refresh replaces the whole list. Refreshes are tagged with a
//! sequence number when they are issued; a response is applied only if no
//! later-issued refresh has been applied already, so a slow response that
//! resolves late can never overwrite newer data.

use crate::types::DetectionEvent;
use std::sync::Arc;

/// Sequence tag handed out when a refresh is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

impl RefreshTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// What happened to a refresh response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A later-issued refresh already landed; the response was discarded.
    Stale { applied: u64 },
}

#[derive(Debug, Default)]
pub struct EventStore {
    events: Arc<[DetectionEvent]>,
    issued: u64,
    applied: u64,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents. Readers hold a complete list: either the one before
    /// or the one after any refresh, never a mix.
    pub fn snapshot(&self) -> Arc<[DetectionEvent]> {
        Arc::clone(&self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sequence of the most recently applied refresh (0 before the first).
    pub fn applied_sequence(&self) -> u64 {
        self.applied
    }

    /// Tag a refresh at the moment it is issued.
    pub fn issue(&mut self) -> RefreshTicket {
        self.issued += 1;
        RefreshTicket(self.issued)
    }

    /// Replace the contents with `events` unless a newer refresh already won.
    pub fn apply(&mut self, ticket: RefreshTicket, events: Vec<DetectionEvent>) -> RefreshOutcome {
        if ticket.0 <= self.applied {
            return RefreshOutcome::Stale {
                applied: self.applied,
            };
        }
        self.events = events.into();
        self.applied = ticket.0;
        RefreshOutcome::Applied
    }
}
