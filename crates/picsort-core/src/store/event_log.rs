// ── Bounded event log ──
//
// Newest-first record of inbound events for diagnostics. Backed by an
// `Observable` so the debug hook and UIs can follow it live.

use std::sync::Arc;

use super::observable::{Observable, Subscription};
use crate::model::Event;

/// Default maximum number of events kept.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 10;

/// Most-recent-first buffer of inbound events.
///
/// `len() <= capacity()` at all times; pushing onto a full log silently
/// drops the oldest entry.
#[derive(Clone)]
pub struct EventLog {
    entries: Observable<Vec<Arc<Event>>>,
    capacity: usize,
}

impl EventLog {
    /// Create an empty log. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Observable::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Prepend `event`, evicting the oldest entry if the log is full.
    pub fn push(&self, event: Arc<Event>) {
        let capacity = self.capacity;
        self.entries.update(move |current| {
            let mut next = Vec::with_capacity(capacity);
            next.push(event);
            next.extend(current.iter().take(capacity - 1).cloned());
            next
        });
    }

    /// Snapshot of the log, newest first.
    pub fn entries(&self) -> Arc<Vec<Arc<Event>>> {
        self.entries.get()
    }

    /// Most recent event, if any.
    pub fn latest(&self) -> Option<Arc<Event>> {
        self.entries.get().first().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.get().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Follow the log; see [`Observable::subscribe`].
    pub fn subscribe(
        &self,
        callback: impl Fn(&Vec<Arc<Event>>) + Send + Sync + 'static,
    ) -> Subscription {
        self.entries.subscribe(callback)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
