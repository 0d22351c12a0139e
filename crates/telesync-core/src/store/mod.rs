// ── Sync store ──
//
// Owns the cached snapshot and drives it from the pull and push
// collaborators. Split by concern: `refresh` holds the pull path and
// retry policy, `channel` holds the push path.

mod channel;
mod refresh;

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use telesync_api::{Fetcher, PushChannel, Snapshot};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::state::{ConnectionState, Mode, SyncState};
use crate::stream::StateStream;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SyncStoreInner>`. Every mutation of the
/// state is a single `watch` update, so readers never observe a
/// half-applied change. Lifecycle is explicit:
/// [`new`](Self::new) → [`initialize`](Self::initialize) →
/// [`disconnect`](Self::disconnect).
///
/// Operations that spawn work (`refresh` failures, `toggle_live`,
/// `open_channel`) must run inside a Tokio runtime.
#[derive(Clone)]
pub struct SyncStore {
    inner: Arc<SyncStoreInner>,
}

struct SyncStoreInner {
    config: SyncConfig,
    fetcher: Arc<dyn Fetcher>,
    channel: Arc<dyn PushChannel>,
    state: watch::Sender<SyncState>,
    /// Cancels the current generation of scheduled retries.
    retry_cancel: Mutex<CancellationToken>,
    /// Event-processing task of the open push channel.
    session: Mutex<Option<ChannelSession>>,
}

struct ChannelSession {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SyncStore {
    /// Create a store around the given collaborators. Does NOT pull or
    /// connect -- call [`initialize()`](Self::initialize).
    pub fn new(
        config: SyncConfig,
        fetcher: Arc<dyn Fetcher>,
        channel: Arc<dyn PushChannel>,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::new(config.stale_threshold));

        Self {
            inner: Arc::new(SyncStoreInner {
                config,
                fetcher,
                channel,
                state,
                retry_cancel: Mutex::new(CancellationToken::new()),
                session: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    // ── State observation ────────────────────────────────────────

    /// Clone of the full current state.
    pub fn state(&self) -> SyncState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    /// Subscribe as a [`StateStream`].
    pub fn stream(&self) -> StateStream {
        StateStream::new(self.inner.state.subscribe())
    }

    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.state.borrow().current)
    }

    pub fn mode(&self) -> Mode {
        self.inner.state.borrow().mode
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn last_error(&self) -> Option<SyncError> {
        self.inner.state.borrow().last_error.clone()
    }

    pub fn connection(&self) -> ConnectionState {
        self.inner.state.borrow().connection
    }

    pub fn retry_count(&self) -> u32 {
        self.inner.state.borrow().retry_count
    }

    pub fn is_stale(&self) -> bool {
        self.inner.state.borrow().is_stale()
    }

    pub fn has_data(&self) -> bool {
        self.inner.state.borrow().has_data()
    }

    pub fn total_points(&self) -> usize {
        self.inner.state.borrow().total_points()
    }

    // ── Internal ─────────────────────────────────────────────────

    fn update(&self, f: impl FnOnce(&mut SyncState)) {
        self.inner.state.send_modify(f);
    }
}
