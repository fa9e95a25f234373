//! Application configuration loaded from environment variables.
//!
//! Every knob has a default suitable for the public PulseChain endpoints, so
//! the service starts with no environment at all. The external stream and
//! the on-disk history snapshot are opt-in: they stay disabled until
//! `SWAPFEED_EXTERNAL_WS_URL` / `SWAPFEED_SNAPSHOT_PATH` are set.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::SwapfeedError;

/// Default chain WebSocket endpoint for the live log subscription.
const DEFAULT_CHAIN_WS_URL: &str = "wss://rpc.pulsechain.com";

/// Default chain HTTP endpoint for backfill and address queries.
const DEFAULT_CHAIN_HTTP_URL: &str = "https://rpc.pulsechain.com";

/// Default primary pair contract address.
const DEFAULT_PAIR_V1_ADDRESS: &str = "0x6753560538eca67617a9ce605178f788be7e524e";

/// Default HTTP bind address.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub chain: ChainConfig,
    pub feed: FeedConfig,
    /// External push-stream endpoint; `None` disables that source.
    pub external_ws_url: Option<String>,
    pub bind_addr: SocketAddr,
    /// History snapshot file; `None` disables persistence.
    pub snapshot_path: Option<PathBuf>,
}

/// Chain endpoints, tracked pair contracts, and amount precision.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub ws_url: String,
    pub http_url: String,
    pub pair_v1_address: String,
    /// Second tracked pair; `None` runs a single chain subscription.
    pub pair_v2_address: Option<String>,
    pub token_decimals: u32,
    pub native_decimals: u32,
}

/// History bounds and subscriber-facing timing.
#[derive(Debug, Clone, Copy)]
pub struct FeedConfig {
    pub history_capacity: usize,
    pub reconnect_delay: Duration,
    pub attach_debounce: Duration,
    pub backfill_blocks: u64,
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`SwapfeedError::Config`] if a numeric variable or the bind
/// address cannot be parsed.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let chain = ChainConfig {
        ws_url: non_empty_var("SWAPFEED_CHAIN_WS_URL")
            .unwrap_or_else(|| DEFAULT_CHAIN_WS_URL.to_string()),
        http_url: non_empty_var("SWAPFEED_CHAIN_HTTP_URL")
            .unwrap_or_else(|| DEFAULT_CHAIN_HTTP_URL.to_string()),
        pair_v1_address: non_empty_var("SWAPFEED_PAIR_V1_ADDRESS")
            .unwrap_or_else(|| DEFAULT_PAIR_V1_ADDRESS.to_string()),
        pair_v2_address: non_empty_var("SWAPFEED_PAIR_V2_ADDRESS"),
        token_decimals: parsed_var("SWAPFEED_TOKEN_DECIMALS", 6)?,
        native_decimals: parsed_var("SWAPFEED_NATIVE_DECIMALS", 18)?,
    };

    let feed = FeedConfig {
        history_capacity: parsed_var("SWAPFEED_HISTORY_CAPACITY", 100)?,
        reconnect_delay: Duration::from_secs(parsed_var("SWAPFEED_RECONNECT_DELAY_SECS", 3)?),
        attach_debounce: Duration::from_secs(parsed_var("SWAPFEED_ATTACH_DEBOUNCE_SECS", 5)?),
        backfill_blocks: parsed_var("SWAPFEED_BACKFILL_BLOCKS", 500)?,
    };

    if feed.history_capacity == 0 {
        return Err(SwapfeedError::Config(
            "SWAPFEED_HISTORY_CAPACITY must be at least 1".to_string(),
        ));
    }

    let bind_addr = non_empty_var("SWAPFEED_BIND_ADDR")
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
        .parse()
        .map_err(|_| SwapfeedError::Config("SWAPFEED_BIND_ADDR is not a valid address".into()))?;

    Ok(AppConfig {
        chain,
        feed,
        external_ws_url: non_empty_var("SWAPFEED_EXTERNAL_WS_URL"),
        bind_addr,
        snapshot_path: non_empty_var("SWAPFEED_SNAPSHOT_PATH").map(PathBuf::from),
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Parses an environment variable, falling back to `default` when unset.
fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> crate::Result<T> {
    match non_empty_var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| SwapfeedError::Config(format!("{name} is not a valid number: {raw}"))),
        None => Ok(default),
    }
}
