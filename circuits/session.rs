//! Live-session accounting
//!
//! Every session carries a [`SessionTicket`]. Dropping the ticket closes it,
//! so the tracker sees exactly one close per session however the session
//! ends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Counts sessions opened and closed through one circuit instance
#[derive(Clone, Debug, Default)]
pub struct SessionTracker {
    counters: Arc<Counters>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a newly built session
    pub fn open(&self) -> SessionTicket {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        SessionTicket {
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    /// Sessions built but not yet released
    pub fn live(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }
}

/// Proof of a live session; closes it on drop
#[derive(Debug)]
pub struct SessionTicket {
    counters: Arc<Counters>,
}

impl Drop for SessionTicket {
    fn drop(&mut self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}
