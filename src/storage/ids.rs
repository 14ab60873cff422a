//! Identifier generation for stored files.
//!
//! Filenames are derived from epoch milliseconds so they sort by arrival
//! time. Plain wall-clock milliseconds collide when two requests land in
//! the same millisecond, so [`MonotonicMillis`] never hands out the same
//! value twice: if the clock has not moved past the last identifier it
//! returns `last + 1` instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Produces the unique part of a stored filename.
///
/// Implementations must be safe to call from every Actix worker at once.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> u64;
}

/// Strictly increasing epoch-millisecond identifiers.
#[derive(Debug, Default)]
pub struct MonotonicMillis {
    last: AtomicU64,
}

impl MonotonicMillis {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for MonotonicMillis {
    fn next_id(&self) -> u64 {
        let now = now_millis();
        // fetch_update retries on contention, so every caller observes a distinct previous value.
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(if now > last { now } else { last + 1 })
            })
            .unwrap_or_else(|last| last);
        if now > previous {
            now
        } else {
            previous + 1
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
