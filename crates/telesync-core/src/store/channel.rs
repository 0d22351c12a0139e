// ── Push path ──
//
// One processing task per opened channel consumes the channel's event
// queue in order and applies each event to the state.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use telesync_api::{DisconnectReason, PushEvent, PushEvents};

use super::{ChannelSession, SyncStore};
use crate::error::SyncError;
use crate::state::{ConnectionState, Mode};

impl SyncStore {
    /// Open the push channel and start consuming its events.
    ///
    /// Replaces any previously opened channel session. On failure the
    /// connection is marked [`Errored`](ConnectionState::Errored), the
    /// error is recorded, and it is returned to the caller.
    pub async fn open_channel(&self) -> Result<(), SyncError> {
        self.stop_session().await;

        let events = match self.inner.channel.open().await {
            Ok(events) => events,
            Err(e) => {
                let error = SyncError::from(e);
                warn!(error = %error, "Failed to open push channel");
                self.update(|s| {
                    s.connection = ConnectionState::Errored;
                    s.last_error = Some(error.clone());
                });
                return Err(error);
            }
        };

        let cancel = CancellationToken::new();
        let task = tokio::spawn(process_events(self.clone(), events, cancel.clone()));
        *self.inner.session.lock().await = Some(ChannelSession { cancel, task });

        debug!("Push channel opened");
        Ok(())
    }

    /// Manual recovery of both paths: [`retry`](Self::retry) the pull,
    /// then reopen the push channel if no session is running.
    ///
    /// A running session is left alone; its channel reconnects itself.
    /// The pull error wins when both paths fail.
    pub async fn recover(&self) -> Result<(), SyncError> {
        let pulled = self.retry().await;

        let running = self
            .inner
            .session
            .lock()
            .await
            .as_ref()
            .is_some_and(|session| !session.task.is_finished());

        let reopened = if running {
            Ok(())
        } else {
            info!("Reopening push channel");
            self.open_channel().await
        };

        pulled.and(reopened)
    }

    /// Close the push channel and cancel pending retries.
    ///
    /// Idempotent: calling it while already disconnected only re-asserts
    /// the [`Disconnected`](ConnectionState::Disconnected) state.
    pub async fn disconnect(&self) {
        self.cancel_scheduled_retries().await;

        if self.stop_session().await {
            self.inner.channel.close().await;
            info!("Push channel closed");
        }

        self.update(|s| s.connection = ConnectionState::Disconnected);
    }

    /// Apply one push event to the state.
    async fn handle_push_event(&self, event: PushEvent) {
        match event {
            PushEvent::Connected => {
                info!("Push channel connected");
                self.update(|s| {
                    s.connection = ConnectionState::Connected;
                    s.retry_count = 0;
                    s.last_error = None;
                });
            }
            PushEvent::Disconnected(reason) => {
                info!(%reason, "Push channel disconnected");
                self.update(|s| s.connection = ConnectionState::Disconnected);

                if reason.is_remote_initiated() {
                    self.reconnect_after(&reason).await;
                }
            }
            PushEvent::Error(message) => {
                warn!(error = %message, "Push channel error");
                self.update(|s| {
                    s.connection = ConnectionState::Errored;
                    s.last_error = Some(SyncError::Transport { message });
                });
            }
            PushEvent::NewData(None) => {
                trace!("Push event without payload ignored");
            }
            PushEvent::NewData(Some(snapshot)) => {
                let points = snapshot.total_points();
                let applied = self.inner.state.send_if_modified(|s| {
                    if s.mode != Mode::Live {
                        return false;
                    }
                    s.replace_snapshot(snapshot);
                    s.last_error = None;
                    true
                });

                if applied {
                    debug!(points, "Received new data");
                } else {
                    trace!(points, "Paused, discarding push data");
                }
            }
        }
    }

    /// The server asked us to leave; ask the channel to come straight back.
    async fn reconnect_after(&self, reason: &DisconnectReason) {
        debug!(%reason, "Server-initiated disconnect, reconnecting");
        if let Err(e) = self.inner.channel.reconnect().await {
            warn!(error = %e, "Reconnect after server disconnect failed");
            self.update(|s| {
                s.last_error = Some(SyncError::RemoteDisconnect {
                    reason: format!("{reason} ({e})"),
                });
            });
        }
    }

    /// Stop the current processing task. Returns `true` if one was running.
    async fn stop_session(&self) -> bool {
        let session = self.inner.session.lock().await.take();
        let Some(session) = session else {
            return false;
        };

        session.cancel.cancel();
        if let Err(e) = session.task.await {
            if e.is_panic() {
                warn!(error = %e, "Push event task panicked");
            }
        }
        true
    }
}

/// Single consumer of a channel's event queue.
async fn process_events(store: SyncStore, mut events: PushEvents, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("Push event queue closed");
                    break;
                };
                store.handle_push_event(event).await;
            }
        }
    }
}
