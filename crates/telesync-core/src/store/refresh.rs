// ── Pull path and retry policy ──
//
// A failed pull records the error and, while under the retry limit,
// schedules the next attempt after a linear backoff. Scheduled retries
// belong to a cancellation generation; a newly scheduled chain, `retry()`
// and `disconnect()` each start a new generation so superseded retries
// never fire.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SyncStore;
use crate::error::SyncError;
use crate::state::Mode;

/// Outcome of one failed pull attempt.
struct PullFailure {
    error: SyncError,
    /// Backoff before the next automatic attempt, if one is allowed.
    retry_in: Option<Duration>,
}

impl SyncStore {
    /// Startup sequence: initial pull, then open the push channel.
    ///
    /// Always completes. A failed pull does not prevent connecting the
    /// push channel, and a failed connect is reported through
    /// `last_error` / `connection` rather than returned.
    pub async fn initialize(&self) {
        info!("Initializing telemetry sync");
        self.update(|s| {
            s.loading = true;
            s.last_error = None;
        });

        if let Err(e) = self.refresh(self.inner.config.default_limit).await {
            warn!(error = %e, "Initial pull failed, continuing with push channel");
        }

        if let Err(e) = self.open_channel().await {
            warn!(error = %e, "Push channel unavailable after initialization");
        }

        self.update(|s| s.loading = false);

        let state = self.state();
        info!(
            points = state.total_points(),
            connection = %state.connection,
            "Telemetry sync initialized"
        );
    }

    /// Pull a fresh snapshot of at most `limit` rows per channel.
    ///
    /// On failure the error is recorded, an automatic retry is scheduled
    /// while `retry_count < max_retries`, and the error is returned.
    pub async fn refresh(&self, limit: u32) -> Result<(), SyncError> {
        match self.pull(limit).await {
            Ok(()) => Ok(()),
            Err(PullFailure { error, retry_in }) => {
                if let Some(delay) = retry_in {
                    self.schedule_retry(limit, delay).await;
                }
                Err(error)
            }
        }
    }

    /// Manual retry: reset the retry budget, then pull and await the outcome.
    pub async fn retry(&self) -> Result<(), SyncError> {
        info!("Manual retry triggered");
        self.cancel_scheduled_retries().await;
        self.update(|s| {
            s.last_error = None;
            s.retry_count = 0;
        });
        self.refresh(self.inner.config.default_limit).await
    }

    /// Flip between live and paused. Resuming live with stale data kicks
    /// off a background refresh.
    pub fn toggle_live(&self) -> Mode {
        let mut mode = Mode::Live;
        let mut stale = false;
        self.update(|s| {
            s.mode = s.mode.toggled();
            mode = s.mode;
            stale = s.is_stale();
        });
        info!(%mode, "Live mode toggled");

        if mode == Mode::Live && stale {
            debug!("Data is stale, refreshing");
            let store = self.clone();
            let limit = self.inner.config.default_limit;
            tokio::spawn(async move {
                if let Err(e) = store.refresh(limit).await {
                    debug!(error = %e, "Refresh after resume failed");
                }
            });
        }

        mode
    }

    // ── Internal ─────────────────────────────────────────────────

    /// One pull attempt with its state bookkeeping.
    async fn pull(&self, limit: u32) -> Result<(), PullFailure> {
        // Limits are positive.
        let limit = limit.max(1);

        self.update(|s| {
            s.loading = true;
            s.last_error = None;
        });
        debug!(limit, "Refreshing snapshot");

        match self.inner.fetcher.fetch(limit).await {
            Ok(snapshot) => {
                let points = snapshot.total_points();
                self.update(|s| {
                    s.replace_snapshot(snapshot);
                    s.retry_count = 0;
                    s.loading = false;
                });
                debug!(points, "Snapshot refreshed");
                Ok(())
            }
            Err(e) => {
                let error = SyncError::from(e);
                let config = &self.inner.config;
                let mut retry_in = None;
                let mut attempt = 0;

                self.update(|s| {
                    s.last_error = Some(error.clone());
                    if s.retry_count < config.max_retries {
                        s.retry_count += 1;
                        attempt = s.retry_count;
                        retry_in = Some(config.retry_delay(s.retry_count));
                    }
                    s.loading = false;
                });

                match retry_in {
                    Some(delay) => warn!(
                        error = %error,
                        attempt,
                        max_retries = config.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Pull failed, retry scheduled"
                    ),
                    None => warn!(
                        error = %error,
                        "Pull failed, retry limit reached -- manual retry required"
                    ),
                }

                Err(PullFailure { error, retry_in })
            }
        }
    }

    /// Spawn the delayed retry chain for `limit`, starting after `delay`.
    ///
    /// Supersedes any chain already waiting: at most one chain runs.
    async fn schedule_retry(&self, limit: u32, delay: Duration) {
        let cancel = {
            let mut guard = self.inner.retry_cancel.lock().await;
            guard.cancel();
            *guard = CancellationToken::new();
            guard.clone()
        };
        let store = self.clone();
        tokio::spawn(async move { store.run_retries(limit, delay, cancel).await });
    }

    /// Wait, pull, and keep going while the policy grants more attempts.
    async fn run_retries(self, limit: u32, mut delay: Duration, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Scheduled retry superseded");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }

            debug!(limit, retry_count = self.retry_count(), "Retrying pull");
            match self.pull(limit).await {
                Ok(()) => {
                    info!("Pull recovered after retry");
                    return;
                }
                Err(PullFailure {
                    retry_in: Some(next),
                    ..
                }) => delay = next,
                Err(PullFailure { retry_in: None, .. }) => return,
            }
        }
    }

    /// Cancel pending retries and start a fresh generation.
    pub(super) async fn cancel_scheduled_retries(&self) {
        let mut guard = self.inner.retry_cancel.lock().await;
        guard.cancel();
        *guard = CancellationToken::new();
    }
}
