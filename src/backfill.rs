//! Historical catch-up for an empty history.
//!
//! Backfill queries the chain's HTTP JSON-RPC endpoint for swap logs over a
//! bounded recent-block window, decodes them with the same parser and
//! decoder as the live path, orders them newest-first, and replaces the
//! history in one step. Failure leaves the history untouched; the query is
//! retried only when a later subscriber attaches to a still-empty history.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::SwapfeedError;
use crate::decoder::SwapDecoder;
use crate::feed::FeedHub;
use crate::models::Trade;
use crate::upstream::chain::{LogRecord, SWAP_TOPIC, parse_swap_log};

/// Minimal JSON-RPC client for the chain's HTTP endpoint.
pub struct RpcClient {
    http_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    message: String,
}

impl RpcClient {
    #[must_use]
    pub fn new(http_url: String) -> Self {
        Self {
            http_url,
            client: reqwest::Client::new(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> crate::Result<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: RpcResponse<T> = self
            .client
            .post(&self.http_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(SwapfeedError::Rpc(err.message));
        }
        response
            .result
            .ok_or_else(|| SwapfeedError::Rpc(format!("{method} returned no result")))
    }

    /// Current chain head height.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unparseable response.
    pub async fn latest_block(&self) -> crate::Result<u64> {
        let hex: String = self.call("eth_blockNumber", json!([])).await?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|_| SwapfeedError::Rpc(format!("bad block number: {hex}")))
    }

    /// Swap logs for one pair over an inclusive block range.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an RPC-level error.
    pub async fn swap_logs(
        &self,
        address: &str,
        from_block: u64,
        to_block: u64,
    ) -> crate::Result<Vec<LogRecord>> {
        self.call(
            "eth_getLogs",
            json!([{
                "address": address,
                "topics": [SWAP_TOPIC],
                "fromBlock": format!("0x{from_block:x}"),
                "toBlock": format!("0x{to_block:x}"),
            }]),
        )
        .await
    }
}

/// Seeds the history from the recent-block window. Any failure is logged
/// and the history stays as it was; backfill never crashes the service.
pub async fn run(
    client: &RpcClient,
    pairs: &[(String, SwapDecoder)],
    lookback_blocks: u64,
    hub: &FeedHub,
) {
    match fetch_recent(client, pairs, lookback_blocks).await {
        Ok(trades) if trades.is_empty() => info!("Backfill found no recent swaps"),
        Ok(trades) => {
            let count = trades.len();
            hub.replace_history(trades).await;
            info!(trades = count, "Backfill seeded history");
        }
        Err(e) => warn!(error = %e, "Backfill query failed, history unchanged"),
    }
}

/// Fetches and decodes recent swaps for every tracked pair, newest-first.
///
/// # Errors
///
/// Returns an error when the head query or any log query fails. Individual
/// logs that fail to decode are skipped.
pub async fn fetch_recent(
    client: &RpcClient,
    pairs: &[(String, SwapDecoder)],
    lookback_blocks: u64,
) -> crate::Result<Vec<Trade>> {
    let latest = client.latest_block().await?;
    let from = latest.saturating_sub(lookback_blocks);

    let mut decoded = Vec::new();
    for (address, decoder) in pairs {
        let logs = client.swap_logs(address, from, latest).await?;
        debug!(pair = %address, logs = logs.len(), "Fetched historical logs");
        for log in &logs {
            let entry = parse_swap_log(log)
                .and_then(|raw| {
                    decoder
                        .decode(&raw)
                        .map(|t| (raw.block_number, raw.log_index, t))
                });
            match entry {
                Ok(entry) => decoded.push(entry),
                Err(rejection) => debug!(%rejection, "Skipping historical log"),
            }
        }
    }

    Ok(order_recent_first(decoded))
}

/// Decoded recent swaps involving one address, over the same lookback
/// window the backfill uses.
///
/// # Errors
///
/// Propagates query failures; the caller maps them to an HTTP error.
pub async fn address_trades(
    client: &RpcClient,
    pairs: &[(String, SwapDecoder)],
    lookback_blocks: u64,
    address: &str,
) -> crate::Result<Vec<Trade>> {
    let trades = fetch_recent(client, pairs, lookback_blocks).await?;
    Ok(trades
        .into_iter()
        .filter(|t| {
            t.buyer.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(address))
                || t.seller.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(address))
        })
        .collect())
}

/// Orders `(block, log index, trade)` entries newest-first: block height
/// descending, then intra-block log index descending.
fn order_recent_first(mut entries: Vec<(u64, u64, Trade)>) -> Vec<Trade> {
    entries.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
    entries.into_iter().map(|(_, _, trade)| trade).collect()
}
