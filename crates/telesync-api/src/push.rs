//! Push collaborator contract.
//!
//! A [`PushChannel`] delivers lifecycle and data events on a single
//! ordered queue. The consumer owns the receiving end; the channel owns
//! its connection and any reconnection policy of its own.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::model::Snapshot;

/// Receiving end of a push channel's event queue.
pub type PushEvents = mpsc::Receiver<PushEvent>;

// ── DisconnectReason ─────────────────────────────────────────────────

/// Why the push connection went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the connection and expects the client to come back.
    ServerInitiated,
    /// The local side closed the connection.
    ClientInitiated,
    /// Transport dropped (reset, ping timeout, stream error).
    Network,
    /// Anything else the channel reports verbatim.
    Other(String),
}

impl DisconnectReason {
    /// Parse a reason string as reported by socket-style transports.
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "io server disconnect" | "server-initiated" => Self::ServerInitiated,
            "io client disconnect" | "client-initiated" => Self::ClientInitiated,
            "transport close" | "transport error" | "ping timeout" | "network" => Self::Network,
            other => Self::Other(other.to_owned()),
        }
    }

    /// `true` when the remote end initiated the close.
    pub fn is_remote_initiated(&self) -> bool {
        matches!(self, Self::ServerInitiated)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerInitiated => f.write_str("server-initiated"),
            Self::ClientInitiated => f.write_str("client-initiated"),
            Self::Network => f.write_str("network"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

// ── PushEvent ────────────────────────────────────────────────────────

/// An event emitted by a push channel, in connection order.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connected,
    Disconnected(DisconnectReason),
    Error(String),
    /// A `new_data` message. `None` when the payload was absent or `null`.
    NewData(Option<Snapshot>),
}

// ── PushChannel ──────────────────────────────────────────────────────

#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Establish the connection and hand back its event queue.
    ///
    /// Opening again replaces any previous connection and queue.
    async fn open(&self) -> Result<PushEvents, Error>;

    /// Drop the current connection (if any) and connect again immediately.
    async fn reconnect(&self) -> Result<(), Error>;

    /// Close the connection. Safe to call when already closed.
    async fn close(&self);
}
