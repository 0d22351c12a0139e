// Pull collaborator: bounded-size snapshot fetch over HTTP.
//
// `GET {base}/data?limit=N` returns the four-channel JSON snapshot.
// Non-2xx responses carry an optional `{ "error": "..." }` body.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::model::Snapshot;
use crate::transport::TransportConfig;

/// Anything that can pull a fresh snapshot.
///
/// Implementations must be idempotent and safe to call repeatedly;
/// the sync store retries failed pulls without further coordination.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Pull at most `limit` rows per channel.
    async fn fetch(&self, limit: u32) -> Result<Snapshot, Error>;
}

/// Error body the server attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// HTTP implementation of [`Fetcher`].
pub struct HttpFetcher {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl HttpFetcher {
    /// Create a fetcher for the server rooted at `base_url`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout_secs: transport.timeout.as_secs(),
        })
    }

    /// Create a fetcher with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout_secs: 0,
        }
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/data`, tolerating a trailing slash on the base.
    fn data_url(&self) -> Result<Url, Error> {
        let full = format!("{}/data", self.base_url.as_str().trim_end_matches('/'));
        Ok(Url::parse(&full)?)
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, limit: u32) -> Result<Snapshot, Error> {
        let url = self.data_url()?;
        debug!(%url, limit, "GET snapshot");

        let resp = self
            .http
            .get(url)
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error);
            return Err(Error::Server {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn data_url_strips_trailing_slash() {
        let fetcher = HttpFetcher::with_client(
            reqwest::Client::new(),
            "http://127.0.0.1:5000/".parse().unwrap(),
        );
        assert_eq!(fetcher.data_url().unwrap().as_str(), "http://127.0.0.1:5000/data");
    }

    #[test]
    fn data_url_keeps_path_prefix() {
        let fetcher = HttpFetcher::with_client(
            reqwest::Client::new(),
            "https://telemetry.example.com/api".parse().unwrap(),
        );
        assert_eq!(
            fetcher.data_url().unwrap().as_str(),
            "https://telemetry.example.com/api/data"
        );
    }
}
