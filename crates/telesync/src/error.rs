//! CLI error types with miette diagnostics.
//!
//! Maps `SyncError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use telesync_config::ConfigError;
use telesync_core::SyncError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the telemetry server: {reason}")]
    #[diagnostic(
        code(telesync::connection_failed),
        help(
            "Check that the backend is running and accessible.\n\
             Try: telesync fetch --server http://localhost:5000"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Push channel failed: {reason}")]
    #[diagnostic(
        code(telesync::push_failed),
        help("Check --push-url, or the push_url in your profile.")
    )]
    PushFailed { reason: String },

    // ── Server ───────────────────────────────────────────────────────
    #[error("Server error: {message}")]
    #[diagnostic(code(telesync::server))]
    Server { message: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(telesync::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(telesync::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(telesync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: telesync config init --name {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(telesync::no_config),
        help(
            "Create a profile with: telesync config init --url <URL>\n\
             Or pass --server / set TELESYNC_SERVER.\n\
             Config expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(telesync::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(telesync::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(telesync::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to render TOML: {0}")]
    #[diagnostic(code(telesync::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::PushFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            _ => exit_code::GENERAL,
        }
    }
}

// ── SyncError → CliError mapping ─────────────────────────────────────

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Network { message } | SyncError::Connection { message } => {
                CliError::ConnectionFailed { reason: message }
            }
            SyncError::Server { message } | SyncError::Unknown { message } => {
                CliError::Server { message }
            }
            SyncError::Timeout => CliError::Timeout,
            SyncError::RemoteDisconnect { reason } => CliError::PushFailed { reason },
            SyncError::Transport { message } => CliError::PushFailed { reason: message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(Box::new(other)),
        }
    }
}

impl From<telesync_api::Error> for CliError {
    fn from(err: telesync_api::Error) -> Self {
        SyncError::from(err).into()
    }
}
