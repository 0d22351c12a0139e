// ── Sync policy configuration ──
//
// Tuning knobs for the sync store. Never touches disk; the CLI builds a
// `SyncConfig` from its profile and hands it in.

use std::time::Duration;

/// Policy for a [`SyncStore`](crate::SyncStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Row limit used by `initialize()`, `retry()` and stale refreshes.
    pub default_limit: u32,
    /// A snapshot older than this is stale.
    pub stale_threshold: Duration,
    /// Consecutive automatic pull retries before manual intervention.
    pub max_retries: u32,
    /// Linear backoff step: retry `n` waits `n * retry_base_delay`.
    pub retry_base_delay: Duration,
}

impl SyncConfig {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const STALE_THRESHOLD: Duration = Duration::from_secs(30);
    pub const MAX_RETRIES: u32 = 3;
    pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(2000);

    /// Delay before automatic retry number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay.saturating_mul(attempt)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_limit: Self::DEFAULT_LIMIT,
            stale_threshold: Self::STALE_THRESHOLD,
            max_retries: Self::MAX_RETRIES,
            retry_base_delay: Self::RETRY_BASE_DELAY,
        }
    }
}
