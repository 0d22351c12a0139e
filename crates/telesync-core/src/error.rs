// ── Core error types ──
//
// Closed set of sync failures. Consumers never see HTTP status codes or
// raw tungstenite errors; the `From<telesync_api::Error>` impl folds
// transport-layer errors into these variants. Errors are `Clone` so the
// most recent one can live inside `SyncState`.

use serde::Serialize;
use thiserror::Error;

/// Message recorded when a pull fails without a server-provided reason.
pub const FETCH_FALLBACK_MESSAGE: &str = "Failed to fetch data";

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncError {
    // ── Pull errors ──────────────────────────────────────────────────
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("{message}")]
    Server { message: String },

    #[error("Request timed out")]
    Timeout,

    // ── Push errors ──────────────────────────────────────────────────
    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Disconnected by server: {reason}")]
    RemoteDisconnect { reason: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    // ── Fallback ─────────────────────────────────────────────────────
    #[error("{message}")]
    Unknown { message: String },
}

impl SyncError {
    /// `true` for errors raised by the pull path.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Server { .. } | Self::Timeout
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<telesync_api::Error> for SyncError {
    fn from(err: telesync_api::Error) -> Self {
        use telesync_api::Error as ApiError;

        match err {
            ApiError::Transport(ref e) if e.is_timeout() => SyncError::Timeout,
            ApiError::Transport(e) => SyncError::Network {
                message: e.to_string(),
            },
            ApiError::Timeout { .. } => SyncError::Timeout,
            ApiError::Server { message, .. } => SyncError::Server {
                message: message.unwrap_or_else(|| FETCH_FALLBACK_MESSAGE.into()),
            },
            ApiError::WebSocketConnect(message) => SyncError::Connection { message },
            ApiError::ChannelClosed => SyncError::Connection {
                message: "push channel is not open".into(),
            },
            ApiError::WebSocketClosed { code, reason } => SyncError::Transport {
                message: format!("closed with code {code}: {reason}"),
            },
            ApiError::InvalidUrl(_) | ApiError::ClientBuild(_) | ApiError::Deserialization { .. } => {
                SyncError::Unknown {
                    message: err.to_string(),
                }
            }
        }
    }
}
