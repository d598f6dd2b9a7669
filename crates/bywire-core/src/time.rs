//! Wall-clock abstraction for deterministic freshness checks.
//!
//! The freshness gate takes `now` as an argument; the HTTP layer reads it
//! from a [`Clock`] so tests can pin time to the fixture timestamps.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Source of wall-clock time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current system time.
    fn now_system(&self) -> SystemTime;
}

/// Production clock backed by [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock instance.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock for tests.
///
/// Clones share the same underlying time, so a handle kept by the test can
/// move the clock seen by a router.
#[derive(Debug, Clone)]
pub struct TestClock {
    /// System time as milliseconds since UNIX_EPOCH
    system_ms: Arc<AtomicU64>,
}

impl TestClock {
    /// Creates a test clock starting at the current time.
    pub fn new() -> Self {
        Self::with_start_time(SystemTime::now())
    }

    /// Creates a test clock starting at a specific time.
    pub fn with_start_time(start: SystemTime) -> Self {
        Self { system_ms: Arc::new(AtomicU64::new(crate::freshness::epoch_millis(start))) }
    }

    /// Creates a test clock reading `ms` milliseconds after the epoch.
    pub fn at_millis(ms: u64) -> Self {
        Self { system_ms: Arc::new(AtomicU64::new(ms)) }
    }

    /// Advances the clock by `duration`.
    pub fn advance(&self, duration: Duration) {
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.system_ms.fetch_add(duration_ms, Ordering::AcqRel);
    }

    /// Jumps the clock to a specific time, forwards or backwards.
    pub fn jump_to(&self, time: SystemTime) {
        self.system_ms.store(crate::freshness::epoch_millis(time), Ordering::Release);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now_system(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.system_ms.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_system_time() {
        let start = UNIX_EPOCH + Duration::from_secs(1000);
        let clock = TestClock::with_start_time(start);

        assert_eq!(clock.now_system(), start);

        clock.advance(Duration::from_secs(60));
        assert_eq!(clock.now_system(), start + Duration::from_secs(60));
    }

    #[test]
    fn test_clock_jump_backwards() {
        let clock = TestClock::at_millis(5_000);
        clock.jump_to(UNIX_EPOCH + Duration::from_millis(2_000));

        assert_eq!(clock.now_system(), UNIX_EPOCH + Duration::from_millis(2_000));
    }

    #[test]
    fn clones_share_time() {
        let clock = TestClock::at_millis(0);
        let handle = clock.clone();

        handle.advance(Duration::from_millis(250));
        assert_eq!(clock.now_system(), UNIX_EPOCH + Duration::from_millis(250));
    }
}
