//! Upstream subscription lifecycle management.
//!
//! [`Subscription`] owns one live connection to an event source and drives
//! the Connecting → Live → PendingRetry loop: connect, feed decoded trades
//! into the hub until the connection drops, wait the fixed retry delay,
//! then connect again with a brand-new transport stream. The loop never
//! gives up; live market data must always attempt to resume.
//!
//! The connection itself hides behind [`Transport`] / [`EventStream`] so
//! the reconnect logic is testable with a scripted fake instead of a real
//! socket.

pub mod chain;
pub mod external;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::feed::FeedHub;
use crate::models::Trade;

/// Factory for upstream connections. Each [`connect`](Transport::connect)
/// call produces a fresh stream; old streams are discarded wholesale, never
/// reused.
pub trait Transport: Send {
    type Stream: EventStream;

    fn connect(&mut self) -> impl Future<Output = crate::Result<Self::Stream>> + Send;
}

/// One live connection's stream of decoded trades.
///
/// Implementations decode inbound frames themselves: frames that reject
/// (irrelevant swaps, malformed payloads) are logged and skipped without
/// surfacing here. `None` means the connection is gone.
pub trait EventStream: Send {
    fn next_trade(&mut self) -> impl Future<Output = Option<Trade>> + Send;
}

/// Lifecycle state of one upstream subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Connecting,
    Live,
    PendingRetry,
}

/// Drives one upstream source's connection lifecycle, forever.
pub struct Subscription<T: Transport> {
    name: &'static str,
    transport: T,
    hub: Arc<FeedHub>,
    retry_delay: Duration,
    state: SubscriptionState,
}

impl<T: Transport> Subscription<T> {
    /// Creates a subscription in the `Connecting` state.
    #[must_use]
    pub fn new(
        name: &'static str,
        transport: T,
        hub: Arc<FeedHub>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            name,
            transport,
            hub,
            retry_delay,
            state: SubscriptionState::Connecting,
        }
    }

    fn set_state(&mut self, state: SubscriptionState) {
        debug!(source = self.name, from = ?self.state, to = ?state, "Subscription transition");
        self.state = state;
    }

    /// Runs the subscription loop indefinitely.
    ///
    /// Every trade the stream yields goes through [`FeedHub::record`], so
    /// insertion and fan-out stay in publish order. Connection errors of
    /// any kind lead to the same place: a fixed delay, then a fresh
    /// connection.
    pub async fn run(mut self) {
        loop {
            info!(source = self.name, "Connecting to upstream");
            match self.transport.connect().await {
                Ok(mut stream) => {
                    self.set_state(SubscriptionState::Live);
                    info!(source = self.name, "Upstream connected");

                    while let Some(trade) = stream.next_trade().await {
                        self.hub.record(trade).await;
                    }
                    warn!(source = self.name, "Upstream connection closed");
                }
                Err(e) => {
                    error!(source = self.name, error = %e, "Upstream connection failed");
                }
            }

            self.set_state(SubscriptionState::PendingRetry);
            tokio::time::sleep(self.retry_delay).await;
            self.set_state(SubscriptionState::Connecting);
        }
    }
}
