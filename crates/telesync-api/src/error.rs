use thiserror::Error;

/// Top-level error type for the `telesync-api` crate.
///
/// Covers every failure mode of both collaborators: the HTTP pull path
/// and the WebSocket push path. `telesync-core` maps these into its
/// closed set of sync errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Server ──────────────────────────────────────────────────────
    /// Non-2xx response. `message` is the body's `error` field, if any.
    #[error(
        "Server error (HTTP {status}){}",
        message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
    )]
    Server { status: u16, message: Option<String> },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// The push channel has not been opened, or was already closed.
    #[error("Push channel is not open")]
    ChannelClosed,
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::WebSocketConnect(_) => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The server-provided error message, if the server sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display_with_message() {
        let err = Error::Server {
            status: 503,
            message: Some("database unavailable".into()),
        };
        assert_eq!(err.to_string(), "Server error (HTTP 503): database unavailable");
        assert_eq!(err.server_message(), Some("database unavailable"));
        assert!(err.is_transient());
    }

    #[test]
    fn server_error_display_without_message() {
        let err = Error::Server {
            status: 400,
            message: None,
        };
        assert_eq!(err.to_string(), "Server error (HTTP 400)");
        assert!(!err.is_transient());
    }
}
