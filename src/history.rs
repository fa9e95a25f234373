//! Bounded recent-trade history.
//!
//! [`TradeHistory`] keeps the most recent trades, newest first. Insertion is
//! always at the front; anything past capacity falls off the tail. The
//! buffer itself is not synchronized — [`crate::feed::FeedHub`] owns the
//! single instance behind its mutex.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::models::Trade;

/// Ordered store of recent trades, most-recent-first, capacity-bounded.
#[derive(Debug)]
pub struct TradeHistory {
    trades: VecDeque<Trade>,
    capacity: usize,
}

impl TradeHistory {
    /// Creates an empty history holding at most `capacity` trades.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            trades: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepends a trade, evicting the oldest entry when full. Existing
    /// entries are never reordered.
    pub fn insert(&mut self, trade: Trade) {
        self.trades.push_front(trade);
        self.trades.truncate(self.capacity);
    }

    /// Replaces the whole buffer with `trades` (given most-recent-first),
    /// truncated to capacity. Used by backfill and snapshot load.
    pub fn replace(&mut self, trades: Vec<Trade>) {
        self.trades = VecDeque::from(trades);
        self.trades.truncate(self.capacity);
    }

    /// Returns an owned copy of the buffer, most-recent-first. Callers never
    /// alias the internal storage.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Trade> {
        self.trades.iter().cloned().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Reads a persisted history snapshot: a JSON array of trades,
/// most-recent-first.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_snapshot(path: &Path) -> crate::Result<Vec<Trade>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Writes a history snapshot as a JSON array, replacing the file atomically
/// via a temporary sibling and rename.
///
/// # Errors
///
/// Returns an error if serialization or the filesystem operations fail.
pub fn write_snapshot(path: &Path, trades: &[Trade]) -> crate::Result<()> {
    let json = serde_json::to_string(trades)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), trades = trades.len(), "Wrote history snapshot");

    Ok(())
}
