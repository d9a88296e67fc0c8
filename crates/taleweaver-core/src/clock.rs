//! Clock abstraction for determinism.

use chrono::{DateTime, Duration, Utc};

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Time elapsed since `earlier`. Negative when `earlier` lies in the future.
    fn elapsed_since(&self, earlier: DateTime<Utc>) -> Duration {
        self.now() - earlier
    }
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
