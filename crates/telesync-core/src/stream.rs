// ── Reactive state stream ──
//
// Subscription type for consuming state changes from the SyncStore.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::state::SyncState;

/// A subscription to the store's state.
///
/// Provides both point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct StateStream {
    current: SyncState,
    receiver: watch::Receiver<SyncState>,
}

impl StateStream {
    pub(crate) fn new(receiver: watch::Receiver<SyncState>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The state captured at creation or at the last `changed()`.
    pub fn current(&self) -> &SyncState {
        &self.current
    }

    /// The latest state (may have changed since the last `changed()`).
    pub fn latest(&self) -> SyncState {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new state.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<SyncState> {
        self.receiver.changed().await.ok()?;
        let state = self.receiver.borrow_and_update().clone();
        self.current = state.clone();
        Some(state)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> StateWatchStream {
        StateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the current state first, then a new state each time the store
/// is mutated.
pub struct StateWatchStream {
    inner: WatchStream<SyncState>,
}

impl Stream for StateWatchStream {
    type Item = SyncState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
