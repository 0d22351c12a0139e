// telesync-api: Pull (HTTP) and push (WebSocket) collaborators for the telemetry server.

pub mod error;
pub mod fetcher;
pub mod model;
pub mod push;
pub mod transport;
pub mod websocket;

pub use error::Error;
pub use fetcher::{Fetcher, HttpFetcher};
pub use model::{Channel, DataPoint, Snapshot};
pub use push::{DisconnectReason, PushChannel, PushEvent, PushEvents};
pub use transport::TransportConfig;
pub use websocket::{ReconnectConfig, WebSocketChannel};
