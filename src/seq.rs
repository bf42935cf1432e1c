// ABOUTME: Monotonic sequence number allocator shared by every outbound request

use std::sync::atomic::{AtomicU64, Ordering};

/// Produces unique, monotonically increasing request sequence numbers.
///
/// Starts at 1 so that 0 can be reserved as a sentinel by callers if
/// needed. Never reused within one allocator's lifetime; at realistic
/// request volumes wraparound is not a concern.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    next: AtomicU64,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next sequence number.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
