// Application constants (no magic values in services)
use std::time::Duration;

/// Longest accepted target URL
pub const MAX_URL_LENGTH: usize = 2048;

/// Default probes running at once within one job
pub const DEFAULT_MAX_PARALLEL_PROBES: usize = 4;

/// Default jobs running at once across the daemon
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 8;

/// Default per-probe call bound (15s)
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 15_000;

/// Default LLM call bound (60s)
pub const DEFAULT_SYNTHESIS_TIMEOUT_MS: u64 = 60_000;

/// Progress band covered by probe resolution (10 -> 90)
pub const PROGRESS_PROBES_START: u8 = 10;
pub const PROGRESS_PROBES_END: u8 = 90;

/// Progress once the delta is computed
pub const PROGRESS_DELTA_DONE: u8 = 95;

/// Default sliding-window rate limit: 10 requests per 60s
pub const DEFAULT_RATE_LIMIT: u32 = 10;
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 60;

/// Default jobs per key per UTC day
pub const DEFAULT_DAILY_QUOTA: u32 = 100;

/// Error recorded on jobs found RUNNING at startup
pub const RECOVERY_ERROR: &str = "interrupted by restart";

/// Worker sleep when the queue is empty (100ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// Worker sleep after a store error before retrying (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Cohort sizing
pub const COHORT_DEFAULT_K: usize = 8;
pub const COHORT_MIN_K: usize = 4;
pub const COHORT_MAX_K: usize = 12;
pub const COHORT_MAX_CONFIRMED: usize = 15;
pub const COHORT_RATIONALE_MAX_CHARS: usize = 200;

/// Minimum cohort size for outlier detection
pub const COHORT_OUTLIER_MIN_TARGETS: usize = 3;

/// Deviations from the norm needed to flag an outlier
pub const COHORT_OUTLIER_MIN_DEVIATIONS: usize = 2;

/// Cap on evidence snippets and fetch-limit notes per matrix row
pub const COHORT_MAX_NOTES: usize = 5;
