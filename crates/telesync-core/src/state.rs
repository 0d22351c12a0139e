// ── Observable sync state ──
//
// Everything the store owns, as one value. Consumers receive clones or
// read-only borrows through the store's `watch` channel; only the store
// itself writes to it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tokio::time::Instant;

use telesync_api::Snapshot;

use crate::error::SyncError;

/// Whether incoming push events are applied to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Live,
    Paused,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Live => Self::Paused,
            Self::Paused => Self::Live,
        }
    }
}

/// Push channel status observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Errored,
}

/// Snapshot of the store's state at one point in time.
#[derive(Debug, Clone)]
pub struct SyncState {
    /// Last known-good data. Replaced as a whole, never patched.
    pub current: Arc<Snapshot>,
    pub mode: Mode,
    /// A pull is in flight.
    pub loading: bool,
    pub last_error: Option<SyncError>,
    /// Monotonic time `current` was last replaced.
    pub last_fetch: Option<Instant>,
    /// Wall-clock twin of `last_fetch`, for display.
    pub last_fetch_at: Option<DateTime<Utc>>,
    pub connection: ConnectionState,
    /// Consecutive pull failures since the last success.
    pub retry_count: u32,
    stale_threshold: Duration,
}

impl SyncState {
    pub(crate) fn new(stale_threshold: Duration) -> Self {
        Self {
            current: Arc::new(Snapshot::default()),
            mode: Mode::Live,
            loading: false,
            last_error: None,
            last_fetch: None,
            last_fetch_at: None,
            connection: ConnectionState::Disconnected,
            retry_count: 0,
            stale_threshold,
        }
    }

    /// Swap in a new snapshot and stamp the fetch time.
    pub(crate) fn replace_snapshot(&mut self, snapshot: Snapshot) {
        self.current = Arc::new(snapshot);
        self.last_fetch = Some(Instant::now());
        self.last_fetch_at = Some(Utc::now());
    }

    // ── Derived ──────────────────────────────────────────────────────

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Instant::now())
    }

    /// Stale when never fetched, or strictly older than the threshold at `now`.
    pub fn is_stale_at(&self, now: Instant) -> bool {
        match self.last_fetch {
            None => true,
            Some(at) => now.saturating_duration_since(at) > self.stale_threshold,
        }
    }

    pub fn has_data(&self) -> bool {
        self.current.has_data()
    }

    pub fn total_points(&self) -> usize {
        self.current.total_points()
    }

    /// Time since `current` was last replaced.
    pub fn age(&self) -> Option<Duration> {
        self.last_fetch.map(|at| at.elapsed())
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn stale_threshold(&self) -> Duration {
        self.stale_threshold
    }
}
