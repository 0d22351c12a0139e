// telesync-core: Synchronization state machine between telesync-api and consumers (CLI/UI).

pub mod config;
pub mod error;
pub mod state;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SyncConfig;
pub use error::SyncError;
pub use state::{ConnectionState, Mode, SyncState};
pub use store::SyncStore;
pub use stream::{StateStream, StateWatchStream};

// Re-export the collaborator contracts and data model so consumers can
// depend on this crate alone.
pub use telesync_api::{
    Channel, DataPoint, DisconnectReason, Fetcher, PushChannel, PushEvent, PushEvents, Snapshot,
};
