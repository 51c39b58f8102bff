//! Activity tracking
//!
//! A single "last interaction" timestamp shared by every UI surface that can
//! observe a touch or scroll. The clock is an owned handle: clone it into each
//! surface instead of reaching for a global.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Shared record of the most recent user interaction
///
/// Clones observe and update the same timestamp. Writes are last-write-wins.
#[derive(Clone, Debug)]
pub struct ActivityClock {
    /// Reference point all offsets are measured from
    origin: Instant,
    /// Offset of the last activity from `origin`, in nanoseconds
    last_activity: Arc<AtomicU64>,
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityClock {
    /// Create a clock whose last activity is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_activity: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a user interaction at the current instant
    pub fn record_activity(&self) {
        let offset = Instant::now().saturating_duration_since(self.origin);
        let nanos = u64::try_from(offset.as_nanos()).unwrap_or(u64::MAX);
        self.last_activity.store(nanos, Ordering::SeqCst);
    }

    /// Instant of the most recent interaction
    pub fn last_activity_at(&self) -> Instant {
        self.origin + Duration::from_nanos(self.last_activity.load(Ordering::SeqCst))
    }

    /// Idle time measured against a given instant
    pub fn idle_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity_at())
    }

    /// Time elapsed since the most recent interaction
    pub fn time_since_last_activity(&self) -> Duration {
        self.idle_at(Instant::now())
    }
}
