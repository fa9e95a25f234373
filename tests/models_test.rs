//! Wire-format tests for the canonical trade record and feed messages.

use rust_decimal_macros::dec;

use swapfeed::decoder::DecodeRejection;
use swapfeed::models::external::{DEFAULT_IMAGE, DEFAULT_TICKER, ExternalTx};
use swapfeed::models::{FeedMessage, Trade, TradeAction, TradeSource};

const EXTERNAL_TX_JSON: &str = include_str!("fixtures/external_tx.json");
const EXTERNAL_TX_MINIMAL_JSON: &str = include_str!("fixtures/external_tx_minimal.json");

fn trade() -> Trade {
    Trade {
        hash: "0xabc".to_string(),
        timestamp: 1_700_000_000,
        buyer: Some("0x2222222222222222222222222222222222222222".to_string()),
        seller: None,
        token_amount: dec!(120.5),
        base_amount: dec!(0.003),
        action: TradeAction::Buy,
        source: TradeSource::PairV1,
        ticker: Some("TEX".to_string()),
        image: None,
    }
}

#[test]
fn test_trade_serializes_camel_case() {
    let value = serde_json::to_value(trade()).expect("serialize trade");

    assert_eq!(value["hash"], "0xabc");
    assert_eq!(value["tokenAmount"], "120.5");
    assert_eq!(value["baseAmount"], "0.003");
    assert_eq!(value["action"], "buy");
    assert_eq!(value["source"], "pairV1");
    assert_eq!(
        value["buyer"],
        "0x2222222222222222222222222222222222222222"
    );
    // Absent optionals are omitted, not null
    assert!(value.get("seller").is_none());
    assert!(value.get("image").is_none());
}

#[test]
fn test_trade_roundtrips_through_json() {
    let original = trade();
    let json = serde_json::to_string(&original).unwrap();
    let restored: Trade = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn test_feed_message_wire_shapes() {
    let history = serde_json::to_value(FeedMessage::History(vec![trade()])).unwrap();
    assert_eq!(history["type"], "history");
    assert!(history["data"].is_array());

    let live = serde_json::to_value(FeedMessage::Trade(trade())).unwrap();
    assert_eq!(live["type"], "trade");
    assert_eq!(live["data"]["hash"], "0xabc");
}

#[test]
fn test_external_tx_maps_all_fields() {
    let payload: ExternalTx = serde_json::from_str(EXTERNAL_TX_JSON).unwrap();
    let result = payload.into_trade(1_700_000_000).expect("payload maps");

    assert_eq!(
        result.hash,
        "0x3f8e21aa54c09c1b7e2d34f1a6b90877d0c2e8b43a5f6d7c8e9a0b1c2d3e4f50"
    );
    assert_eq!(result.action, TradeAction::Sell);
    assert_eq!(
        result.seller.as_deref(),
        Some("0x9999999999999999999999999999999999999999")
    );
    assert!(result.buyer.is_none());
    assert_eq!(result.token_amount, dec!(42.75));
    assert_eq!(result.base_amount, dec!(0.0125));
    assert_eq!(result.source, TradeSource::External);
    assert_eq!(result.ticker.as_deref(), Some("WXYZ"));
    assert_eq!(
        result.image.as_deref(),
        Some("https://cdn.example.com/tokens/wxyz.png")
    );
    assert_eq!(result.timestamp, 1_700_000_000);
}

#[test]
fn test_external_tx_defaults_for_missing_fields() {
    let payload: ExternalTx = serde_json::from_str(EXTERNAL_TX_MINIMAL_JSON).unwrap();
    let result = payload.into_trade(1_700_000_000).expect("payload maps");

    assert_eq!(result.hash, "unknown");
    // Missing type defaults to buy, so the unknown wallet is the buyer
    assert_eq!(result.action, TradeAction::Buy);
    assert_eq!(result.buyer.as_deref(), Some("unknown"));
    assert_eq!(result.ticker.as_deref(), Some(DEFAULT_TICKER));
    assert_eq!(result.image.as_deref(), Some(DEFAULT_IMAGE));
}

#[test]
fn test_external_tx_without_amounts_is_rejected() {
    let payload: ExternalTx = serde_json::from_str("{}").unwrap();
    assert_eq!(
        payload.into_trade(1_700_000_000).unwrap_err(),
        DecodeRejection::ZeroAmount
    );
}

#[test]
fn test_external_tx_with_zero_amount_is_rejected() {
    let payload: ExternalTx =
        serde_json::from_str(r#"{"amountInToken": 0, "amountInChainCurrency": 5}"#).unwrap();
    assert_eq!(
        payload.into_trade(1_700_000_000).unwrap_err(),
        DecodeRejection::ZeroAmount
    );
}
