//! Chain log subscription transport.
//!
//! Subscribes to the pair contract's swap logs over the node's WebSocket
//! JSON-RPC interface (`eth_subscribe` with a `logs` filter) and decodes
//! each notification into a [`Trade`]. The same raw log shape comes back
//! from the historical `eth_getLogs` query, so the log parsing here is
//! shared with backfill.

use alloy_primitives::U256;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use tungstenite::Message;

use super::{EventStream, Transport};
use crate::decoder::{DecodeRejection, RawSwapEvent, SwapDecoder};
use crate::models::Trade;

/// Event signature topic of the pair swap log:
/// `Swap(address,uint256,uint256,uint256,uint256,address)`.
pub const SWAP_TOPIC: &str =
    "0xd78ad95fa46c994b6551d0da85fc275fe613ce37657fb8d5e3d130840159d822";

/// A chain WebSocket connection.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A raw log record as delivered by both the live subscription and
/// `eth_getLogs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(default)]
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: Option<String>,
    pub log_index: Option<String>,
    pub transaction_hash: Option<String>,
}

/// Connects to a chain node and subscribes to one pair's swap logs.
pub struct ChainTransport {
    ws_url: String,
    pair_address: String,
    decoder: SwapDecoder,
}

impl ChainTransport {
    #[must_use]
    pub fn new(ws_url: String, pair_address: String, decoder: SwapDecoder) -> Self {
        Self {
            ws_url,
            pair_address,
            decoder,
        }
    }
}

impl Transport for ChainTransport {
    type Stream = ChainStream;

    async fn connect(&mut self) -> crate::Result<ChainStream> {
        let (mut ws, _) = connect_async(&self.ws_url).await?;
        info!(url = %self.ws_url, "Chain WebSocket handshake completed");

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_subscribe",
            "params": ["logs", {
                "address": self.pair_address,
                "topics": [SWAP_TOPIC],
            }],
        });
        ws.send(Message::Text(serde_json::to_string(&request)?.into()))
            .await?;
        info!(pair = %self.pair_address, "Subscribed to swap logs");

        Ok(ChainStream {
            ws,
            decoder: self.decoder,
        })
    }
}

/// One live chain subscription's decoded trade stream.
pub struct ChainStream {
    ws: WsStream,
    decoder: SwapDecoder,
}

impl EventStream for ChainStream {
    async fn next_trade(&mut self) -> Option<Trade> {
        loop {
            let msg = match self.ws.next().await? {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(error = %e, "Chain WebSocket error");
                    return None;
                }
            };

            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => {
                    debug!("Chain WebSocket closed by peer");
                    return None;
                }
                // Binary/Ping/Pong frames
                _ => continue,
            };

            let log = match subscription_log(&text) {
                Ok(Some(log)) => log,
                // Subscription ack or unrelated frame
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "Unparseable chain message");
                    continue;
                }
            };

            match parse_swap_log(&log).and_then(|raw| self.decoder.decode(&raw)) {
                Ok(trade) => return Some(trade),
                Err(rejection) => {
                    debug!(%rejection, "Skipping swap log");
                }
            }
        }
    }
}

/// Extracts the log record from an `eth_subscription` notification, or
/// `None` for any other frame (subscription acks, errors we ignore).
///
/// # Errors
///
/// Returns an error when the frame is not valid JSON or the notification
/// payload does not look like a log.
pub fn subscription_log(text: &str) -> crate::Result<Option<LogRecord>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if value.get("method").and_then(|m| m.as_str()) != Some("eth_subscription") {
        return Ok(None);
    }
    let result = value
        .get("params")
        .and_then(|p| p.get("result"))
        .cloned()
        .ok_or_else(|| {
            crate::SwapfeedError::MalformedMessage("notification without params.result".into())
        })?;

    Ok(Some(serde_json::from_value(result)?))
}

/// Parses a swap log's positional layout into a [`RawSwapEvent`].
///
/// The data segment is four 32-byte words: `amount0In`, `amount1In`,
/// `amount0Out`, `amount1Out`. Topics 1 and 2 carry the padded sender and
/// counterparty addresses.
///
/// # Errors
///
/// Returns [`DecodeRejection::Malformed`] when the data segment is short or
/// a word is not hex.
pub fn parse_swap_log(log: &LogRecord) -> Result<RawSwapEvent, DecodeRejection> {
    let data = log.data.trim_start_matches("0x");
    if data.len() < 4 * 64 {
        return Err(DecodeRejection::Malformed(format!(
            "data segment holds {} hex chars, expected at least 256",
            data.len()
        )));
    }

    let word = |i: usize| -> Result<U256, DecodeRejection> {
        U256::from_str_radix(&data[i * 64..(i + 1) * 64], 16)
            .map_err(|_| DecodeRejection::Malformed(format!("word {i} is not hex")))
    };

    Ok(RawSwapEvent {
        sender: topic_address(log.topics.get(1)),
        to: topic_address(log.topics.get(2)),
        amount0_in: word(0)?,
        amount1_in: word(1)?,
        amount0_out: word(2)?,
        amount1_out: word(3)?,
        tx_hash: log.transaction_hash.clone(),
        block_number: log.block_number.as_deref().and_then(hex_u64).unwrap_or(0),
        log_index: log.log_index.as_deref().and_then(hex_u64).unwrap_or(0),
    })
}

/// Recovers an address from a 32-byte-padded topic.
fn topic_address(topic: Option<&String>) -> Option<String> {
    let hex = topic?.trim_start_matches("0x");
    (hex.len() == 64).then(|| format!("0x{}", &hex[24..]))
}

/// Parses a `0x`-prefixed hex quantity.
fn hex_u64(raw: &str) -> Option<u64> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16).ok()
}
