// Scripted collaborators for driving a SyncStore in tests.
#![allow(clippy::unwrap_used, dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Notify, mpsc};
use tokio::time::Instant;

use telesync_api::{DataPoint, Error, Fetcher, PushChannel, PushEvent, PushEvents, Snapshot};
use telesync_core::{SyncConfig, SyncStore};

// ── Fixtures ────────────────────────────────────────────────────────

fn rows(prefix: &str, ids: &[u64]) -> Vec<DataPoint> {
    ids.iter()
        .map(|id| DataPoint::new(json!({ "id": id, "source": prefix })))
        .collect()
}

/// Snapshot with `n` rows in every channel, tagged with `tag`.
pub fn snapshot(tag: &str, n: u64) -> Snapshot {
    let ids: Vec<u64> = (1..=n).collect();
    Snapshot {
        battery_data: rows(tag, &ids),
        motor_data: rows(tag, &ids),
        mppt_data: rows(tag, &ids),
        vehicle_data: rows(tag, &ids),
    }
}

/// Let spawned tasks run. Under paused time this also nudges the clock by 1ms.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// ── MockFetcher ─────────────────────────────────────────────────────

/// Fetcher that replays a script, then falls back to a default outcome.
///
/// `None` entries (and a `None` default) fail with a 503 carrying
/// "database unavailable".
pub struct MockFetcher {
    script: Mutex<VecDeque<Option<Snapshot>>>,
    default: Option<Snapshot>,
    calls: Mutex<Vec<(u32, Instant)>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockFetcher {
    pub fn ok(snapshot: Snapshot) -> Arc<Self> {
        Arc::new(Self::with_default(Some(snapshot)))
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::with_default(None))
    }

    fn with_default(default: Option<Snapshot>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default,
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    /// Queue the outcome of the next unscripted call.
    pub fn then(&self, outcome: Option<Snapshot>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Make every following call wait until the returned `Notify` fires.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn limits(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|(l, _)| *l).collect()
    }

    /// Offsets of each call relative to `origin`, in milliseconds.
    pub fn call_offsets_ms(&self, origin: Instant) -> Vec<u128> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| at.duration_since(origin).as_millis())
            .collect()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, limit: u32) -> Result<Snapshot, Error> {
        self.calls.lock().unwrap().push((limit, Instant::now()));

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        let outcome = match scripted {
            Some(outcome) => outcome,
            None => self.default.clone(),
        };

        outcome.ok_or_else(|| Error::Server {
            status: 503,
            message: Some("database unavailable".into()),
        })
    }
}

// ── MockChannel ─────────────────────────────────────────────────────

/// Push channel whose events are injected by the test.
#[derive(Default)]
pub struct MockChannel {
    sender: Mutex<Option<mpsc::Sender<PushEvent>>>,
    fail_open: AtomicBool,
    opens: AtomicUsize,
    reconnects: AtomicUsize,
    closes: AtomicUsize,
}

impl MockChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refusing() -> Arc<Self> {
        let channel = Self::default();
        channel.fail_open.store(true, Ordering::SeqCst);
        Arc::new(channel)
    }

    /// Let subsequent `open` calls succeed.
    pub fn accept(&self) {
        self.fail_open.store(false, Ordering::SeqCst);
    }

    /// Deliver an event as if the connection produced it.
    pub async fn emit(&self, event: PushEvent) {
        let tx = self.sender.lock().unwrap().clone().expect("channel not open");
        tx.send(event).await.unwrap();
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn reconnects(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushChannel for MockChannel {
    async fn open(&self) -> Result<PushEvents, Error> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(Error::WebSocketConnect("connection refused".into()));
        }
        let (tx, rx) = mpsc::channel(64);
        *self.sender.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn reconnect(&self) -> Result<(), Error> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.sender.lock().unwrap().take();
    }
}

// ── Store construction ──────────────────────────────────────────────

pub fn store(fetcher: &Arc<MockFetcher>, channel: &Arc<MockChannel>) -> SyncStore {
    SyncStore::new(
        SyncConfig::default(),
        Arc::clone(fetcher) as Arc<dyn Fetcher>,
        Arc::clone(channel) as Arc<dyn PushChannel>,
    )
}
