//! Trade fan-out and subscriber registry.
//!
//! [`FeedHub`] is the single synchronization boundary of the service: the
//! bounded history and the subscriber set live behind one mutex, injected
//! into both the ingestion path and the serving path. Holding one lock
//! across snapshot-and-register (attach) and insert-and-fan-out (record)
//! gives every subscriber the exact global publish order, and a trade
//! racing an attach lands in exactly one of the snapshot or the live
//! stream.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tracing::warn;

use crate::history::{self, TradeHistory};
use crate::models::{FeedMessage, Trade, TradeSource};

/// Per-subscriber delivery buffer. A subscriber that falls this far behind
/// is detached rather than allowed to stall the publish path.
const SUBSCRIBER_BUFFER: usize = 256;

/// Attach was refused because the origin reconnected too quickly.
#[derive(Debug, thiserror::Error)]
#[error("origin {origin} reattached within the debounce interval")]
pub struct AttachRejected {
    pub origin: String,
}

/// One attached subscriber: its registry id and the receiving end of its
/// delivery channel. The first message received is always the history
/// snapshot.
pub struct SubscriberChannel {
    pub id: u64,
    pub rx: mpsc::Receiver<FeedMessage>,
}

struct HubInner {
    history: TradeHistory,
    subscribers: HashMap<u64, mpsc::Sender<FeedMessage>>,
    last_attach: HashMap<String, Instant>,
    next_id: u64,
}

/// Shared core: bounded history plus subscriber fan-out.
pub struct FeedHub {
    inner: Mutex<HubInner>,
    attach_debounce: Duration,
    snapshot_path: Option<PathBuf>,
}

impl FeedHub {
    /// Creates a hub with an empty history of the given capacity.
    #[must_use]
    pub fn new(
        history_capacity: usize,
        attach_debounce: Duration,
        snapshot_path: Option<PathBuf>,
    ) -> Self {
        Self {
            inner: Mutex::new(HubInner {
                history: TradeHistory::new(history_capacity),
                subscribers: HashMap::new(),
                last_attach: HashMap::new(),
                next_id: 0,
            }),
            attach_debounce,
            snapshot_path,
        }
    }

    /// Attaches a subscriber from `origin`.
    ///
    /// The snapshot is computed and the channel registered under the same
    /// lock, so no published trade can fall between the two or appear in
    /// both. The snapshot is already queued on the returned channel.
    ///
    /// # Errors
    ///
    /// Returns [`AttachRejected`] when `origin` attached less than the
    /// debounce interval ago.
    pub async fn attach(&self, origin: &str) -> Result<SubscriberChannel, AttachRejected> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        if let Some(last) = inner.last_attach.get(origin) {
            if now.duration_since(*last) < self.attach_debounce {
                return Err(AttachRejected {
                    origin: origin.to_string(),
                });
            }
        }
        let debounce = self.attach_debounce;
        inner
            .last_attach
            .retain(|_, last| now.duration_since(*last) < debounce);
        inner.last_attach.insert(origin.to_string(), now);

        let id = inner.next_id;
        inner.next_id += 1;

        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let snapshot = inner.history.snapshot();
        if tx.try_send(FeedMessage::History(snapshot)).is_ok() {
            inner.subscribers.insert(id, tx);
        }

        Ok(SubscriberChannel { id, rx })
    }

    /// Removes a subscriber. Safe to call for an id that is already gone.
    pub async fn detach(&self, id: u64) {
        self.inner.lock().await.subscribers.remove(&id);
    }

    /// Records a new trade: inserts it into the history, rewrites the
    /// snapshot file when persistence is configured, and delivers it to
    /// every attached subscriber. This is the single ingestion entry point
    /// shared by all upstream subscriptions.
    pub async fn record(&self, trade: Trade) {
        let mut inner = self.inner.lock().await;
        inner.history.insert(trade.clone());
        if let Some(path) = &self.snapshot_path {
            if let Err(e) = history::write_snapshot(path, &inner.history.snapshot()) {
                warn!(error = %e, "Failed to persist history snapshot");
            }
        }
        fan_out(&mut inner, trade);
    }

    /// Delivers a trade to every attached subscriber without touching the
    /// history.
    pub async fn publish(&self, trade: Trade) {
        let mut inner = self.inner.lock().await;
        fan_out(&mut inner, trade);
    }

    /// Replaces the whole history, used by backfill and startup snapshot
    /// load. Nothing is broadcast; the data predates every subscriber.
    pub async fn replace_history(&self, trades: Vec<Trade>) {
        self.inner.lock().await.history.replace(trades);
    }

    /// Owned copy of the current history, most-recent-first.
    pub async fn snapshot(&self) -> Vec<Trade> {
        self.inner.lock().await.history.snapshot()
    }

    /// Current history entries from the external stream only.
    pub async fn external_trades(&self) -> Vec<Trade> {
        self.inner
            .lock()
            .await
            .history
            .snapshot()
            .into_iter()
            .filter(|t| t.source == TradeSource::External)
            .collect()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.history.is_empty()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.inner.lock().await.subscribers.len()
    }
}

/// Sends a trade to every subscriber, detaching any whose buffer is full or
/// whose receiver is gone. Delivery is `try_send`, so a slow subscriber
/// never blocks the caller or the other subscribers.
fn fan_out(inner: &mut HubInner, trade: Trade) {
    let mut dropped = Vec::new();
    for (id, tx) in &inner.subscribers {
        if tx.try_send(FeedMessage::Trade(trade.clone())).is_err() {
            dropped.push(*id);
        }
    }
    for id in dropped {
        warn!(subscriber = id, "Subscriber unreachable or lagging, detaching");
        inner.subscribers.remove(&id);
    }
}
