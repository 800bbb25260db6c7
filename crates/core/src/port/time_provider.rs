// Time Provider Port (for testability)

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Current time in milliseconds since epoch
    fn now_millis(&self) -> i64;
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// UTC calendar date (`YYYY-MM-DD`) of an epoch-ms instant; quota rows are keyed by it
pub fn utc_date(now_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(now_millis)
        .unwrap_or_default()
        .format("%Y-%m-%d")
        .to_string()
}

/// Epoch ms of the next UTC midnight after `now_millis`
pub fn next_utc_midnight(now_millis: i64) -> i64 {
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    (now_millis.div_euclid(DAY_MS) + 1) * DAY_MS
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Manually driven clock
    pub struct MockTimeProvider {
        now: AtomicI64,
    }

    impl MockTimeProvider {
        pub fn new(start_millis: i64) -> Self {
            Self {
                now: AtomicI64::new(start_millis),
            }
        }

        pub fn advance(&self, millis: i64) {
            self.now.fetch_add(millis, Ordering::SeqCst);
        }

        pub fn set(&self, millis: i64) {
            self.now.store(millis, Ordering::SeqCst);
        }
    }

    impl TimeProvider for MockTimeProvider {
        fn now_millis(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
