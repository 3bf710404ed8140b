//! Wall-clock seam used by the fetcher's waits.
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time and of blocking sleeps.
pub trait Clock: Send {
    /// Current UNIX time in seconds.
    fn now_unix(&self) -> u64;
    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

impl fmt::Debug for dyn Clock + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Clock")
    }
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
