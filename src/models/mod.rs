//! Canonical trade record and subscriber wire messages.
//!
//! Every upstream source, whatever its raw shape, normalizes into [`Trade`]
//! before touching the history or the fan-out. Wire form is camelCase JSON;
//! amounts serialize as strings via `rust_decimal`'s default serde.

pub mod external;

use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sentinel transaction identifier for events that arrive without one.
pub const UNKNOWN_HASH: &str = "unknown";

/// A normalized buy/sell event, immutable once constructed.
///
/// `token_amount` and `base_amount` are strictly positive; construction
/// paths reject zero on either side so degenerate swap legs never reach the
/// history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Transaction identifier, or [`UNKNOWN_HASH`].
    pub hash: String,
    /// Unix seconds at decode time (local observation, not chain time).
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller: Option<String>,
    /// Traded-asset quantity, scaled by the token's decimal exponent.
    pub token_amount: Decimal,
    /// Settlement-asset quantity, scaled by the native currency's exponent.
    pub base_amount: Decimal,
    pub action: TradeAction,
    pub source: TradeSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Trade direction relative to the tracked token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Which upstream produced a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TradeSource {
    /// The primary tracked pair contract.
    PairV1,
    /// The secondary tracked pair contract.
    PairV2,
    /// The externally-sourced transaction stream.
    External,
}

impl TradeSource {
    /// Returns the wire-format source tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSource::PairV1 => "pairV1",
            TradeSource::PairV2 => "pairV2",
            TradeSource::External => "external",
        }
    }
}

/// A message delivered to an attached subscriber.
///
/// Exactly one `History` message is sent at attach time, followed by one
/// `Trade` message per published trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum FeedMessage {
    History(Vec<Trade>),
    Trade(Trade),
}

/// Current wall-clock time as Unix seconds.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
