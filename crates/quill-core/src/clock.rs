//! Time source for event timestamps.

use chrono::{DateTime, Utc};

/// Supplies the `occurred_at` stamp for newly constructed domain events.
///
/// Handlers never call `Utc::now()` directly, so tests can pin time and
/// replays produce identical read-model timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
