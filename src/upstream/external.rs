//! External transaction stream transport.
//!
//! The external source pushes one JSON payload per trade over a plain
//! WebSocket. Mapping into the canonical record is a field-by-field
//! passthrough with defaults; see
//! [`ExternalTx::into_trade`](crate::models::external::ExternalTx::into_trade).

use futures_util::StreamExt;
use tokio_tungstenite::connect_async;
use tracing::{debug, info, warn};
use tungstenite::Message;

use super::chain::WsStream;
use super::{EventStream, Transport};
use crate::models::external::ExternalTx;
use crate::models::{Trade, unix_timestamp};

/// Connects to the external push stream.
pub struct ExternalTransport {
    ws_url: String,
}

impl ExternalTransport {
    #[must_use]
    pub fn new(ws_url: String) -> Self {
        Self { ws_url }
    }
}

impl Transport for ExternalTransport {
    type Stream = ExternalStream;

    async fn connect(&mut self) -> crate::Result<ExternalStream> {
        let (ws, _) = connect_async(&self.ws_url).await?;
        info!(url = %self.ws_url, "External stream connected");

        Ok(ExternalStream { ws })
    }
}

/// One live external connection's decoded trade stream.
pub struct ExternalStream {
    ws: WsStream,
}

impl EventStream for ExternalStream {
    async fn next_trade(&mut self) -> Option<Trade> {
        loop {
            let msg = match self.ws.next().await? {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(error = %e, "External stream WebSocket error");
                    return None;
                }
            };

            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => {
                    debug!("External stream closed by peer");
                    return None;
                }
                _ => continue,
            };

            let payload: ExternalTx = match serde_json::from_str(&text) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "Malformed external transaction payload");
                    continue;
                }
            };

            match payload.into_trade(unix_timestamp()) {
                Ok(trade) => return Some(trade),
                Err(rejection) => {
                    debug!(%rejection, "Skipping external transaction");
                }
            }
        }
    }
}
