// ABOUTME: Sequence -> handler map. Insert, lookup, remove and drain are all serialized under
// ABOUTME: one lock; `on_cleanup` always runs after that lock is released (see `handler`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::handler::Handler;

/// Maps a request's sequence number to the handler awaiting its replies.
///
/// `on_cleanup` must never run while the dispatch lock is held: a handler's
/// own cleanup only touches its own lock, but holding two locks at once
/// here would reintroduce the lock-ordering hazard the query `done` path
/// is built to avoid (see `handler::QueryHandler`).
#[derive(Debug, Default)]
pub struct DispatchTable {
    inner: Mutex<HashMap<u64, Arc<Handler>>>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `seq`. Must happen before the matching
    /// request is sent, or the reader loop could observe a reply for a
    /// sequence that has no handler yet.
    pub fn register(&self, seq: u64, handler: Arc<Handler>) {
        self.inner.lock().unwrap().insert(seq, handler);
    }

    /// Look up the handler for `seq` without removing it.
    pub fn lookup(&self, seq: u64) -> Option<Arc<Handler>> {
        self.inner.lock().unwrap().get(&seq).cloned()
    }

    /// Remove the handler for `seq`, if any, and run its cleanup outside
    /// the lock. Idempotent: a second call for the same `seq` is a no-op.
    pub fn deregister(&self, seq: u64) {
        let removed = self.inner.lock().unwrap().remove(&seq);
        if let Some(handler) = removed {
            handler.on_cleanup();
        }
    }

    /// Atomically take every registered handler and run their cleanup
    /// outside the lock. Used exactly once, at shutdown.
    pub fn drain(&self) {
        let removed = std::mem::take(&mut *self.inner.lock().unwrap());
        for (_, handler) in removed {
            handler.on_cleanup();
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}
