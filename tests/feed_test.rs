//! Fan-out and subscriber registry tests.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use swapfeed::feed::FeedHub;
use swapfeed::models::{FeedMessage, Trade, TradeAction, TradeSource};

const DEBOUNCE: Duration = Duration::from_secs(5);

fn hub(capacity: usize) -> Arc<FeedHub> {
    Arc::new(FeedHub::new(capacity, DEBOUNCE, None))
}

fn trade(hash: &str) -> Trade {
    Trade {
        hash: hash.to_string(),
        timestamp: 1_700_000_000,
        buyer: None,
        seller: None,
        token_amount: dec!(1),
        base_amount: dec!(1),
        action: TradeAction::Buy,
        source: TradeSource::PairV1,
        ticker: None,
        image: None,
    }
}

fn external_trade(hash: &str) -> Trade {
    Trade {
        source: TradeSource::External,
        ..trade(hash)
    }
}

#[tokio::test]
async fn test_attach_receives_snapshot_then_live_stream() {
    let hub = hub(10);
    hub.record(trade("a")).await;
    hub.record(trade("b")).await;

    let mut channel = hub.attach("10.0.0.1").await.expect("attach accepted");

    let Some(FeedMessage::History(snapshot)) = channel.rx.recv().await else {
        panic!("first message must be the history snapshot");
    };
    let hashes: Vec<&str> = snapshot.iter().map(|t| t.hash.as_str()).collect();
    assert_eq!(hashes, ["b", "a"]);

    hub.record(trade("c")).await;
    let Some(FeedMessage::Trade(live)) = channel.rx.recv().await else {
        panic!("expected a live trade message");
    };
    assert_eq!(live.hash, "c");
}

#[tokio::test]
async fn test_subscribers_observe_global_publish_order() {
    let hub = hub(10);
    let mut first = hub.attach("10.0.0.1").await.unwrap();
    let mut second = hub.attach("10.0.0.2").await.unwrap();

    for hash in ["a", "b", "c"] {
        hub.record(trade(hash)).await;
    }

    for channel in [&mut first, &mut second] {
        let Some(FeedMessage::History(_)) = channel.rx.recv().await else {
            panic!("expected snapshot first");
        };
        for expected in ["a", "b", "c"] {
            let Some(FeedMessage::Trade(live)) = channel.rx.recv().await else {
                panic!("expected live trade");
            };
            assert_eq!(live.hash, expected);
        }
    }
}

#[tokio::test]
async fn test_trade_before_attach_is_in_snapshot_not_restreamed() {
    let hub = hub(10);
    hub.record(trade("boundary")).await;

    let mut channel = hub.attach("10.0.0.1").await.unwrap();
    hub.record(trade("after")).await;

    let Some(FeedMessage::History(snapshot)) = channel.rx.recv().await else {
        panic!("expected snapshot first");
    };
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].hash, "boundary");

    // The boundary trade must not arrive a second time as a live message.
    let Some(FeedMessage::Trade(live)) = channel.rx.recv().await else {
        panic!("expected live trade");
    };
    assert_eq!(live.hash, "after");
}

#[tokio::test]
async fn test_concurrent_publish_lands_in_snapshot_or_stream_exactly_once() {
    let hub = hub(100);

    // Race attaches against records; every subscriber must see every trade
    // exactly once across snapshot + stream.
    let publisher = {
        let hub = hub.clone();
        tokio::spawn(async move {
            for i in 0..50 {
                hub.record(trade(&format!("t{i}"))).await;
                tokio::task::yield_now().await;
            }
        })
    };

    let mut channels = Vec::new();
    for i in 0..10 {
        let origin = format!("10.0.1.{i}");
        channels.push(hub.attach(&origin).await.unwrap());
        tokio::task::yield_now().await;
    }
    publisher.await.unwrap();

    for mut channel in channels {
        let Some(FeedMessage::History(snapshot)) = channel.rx.recv().await else {
            panic!("expected snapshot first");
        };
        let mut seen: Vec<String> = snapshot.into_iter().rev().map(|t| t.hash).collect();
        while let Ok(msg) = channel.rx.try_recv() {
            let FeedMessage::Trade(live) = msg else {
                panic!("snapshot must arrive exactly once");
            };
            seen.push(live.hash);
        }
        // Oldest-first reconstruction covers all fifty trades, no
        // duplicate and no gap at the snapshot/stream boundary.
        let expected: Vec<String> = (0..50).map(|i| format!("t{i}")).collect();
        assert_eq!(seen, expected);
    }
}

#[tokio::test(start_paused = true)]
async fn test_same_origin_reattach_is_debounced() {
    let hub = hub(10);

    assert!(hub.attach("10.0.0.1").await.is_ok());
    let rejected = hub.attach("10.0.0.1").await;
    assert!(rejected.is_err());

    // A different origin is unaffected
    assert!(hub.attach("10.0.0.2").await.is_ok());

    tokio::time::advance(DEBOUNCE + Duration::from_millis(1)).await;
    assert!(hub.attach("10.0.0.1").await.is_ok());
}

#[tokio::test]
async fn test_detach_is_idempotent() {
    let hub = hub(10);
    let channel = hub.attach("10.0.0.1").await.unwrap();
    assert_eq!(hub.subscriber_count().await, 1);

    hub.detach(channel.id).await;
    hub.detach(channel.id).await;
    assert_eq!(hub.subscriber_count().await, 0);
}

#[tokio::test]
async fn test_lagging_subscriber_is_detached_others_keep_receiving() {
    let hub = hub(1000);

    // This subscriber never reads; its buffer will fill and overflow.
    let stalled = hub.attach("10.0.0.1").await.unwrap();
    let mut healthy = hub.attach("10.0.0.2").await.unwrap();
    assert_eq!(hub.subscriber_count().await, 2);

    // More trades than the per-subscriber buffer holds.
    for i in 0..300 {
        hub.record(trade(&format!("t{i}"))).await;
        // Keep the healthy subscriber drained so only the stalled one lags.
        while let Ok(msg) = healthy.rx.try_recv() {
            drop(msg);
        }
    }

    assert_eq!(hub.subscriber_count().await, 1);
    drop(stalled);

    // The healthy subscriber still gets new trades.
    hub.record(trade("fresh")).await;
    let Some(FeedMessage::Trade(live)) = healthy.rx.recv().await else {
        panic!("healthy subscriber should still receive");
    };
    assert_eq!(live.hash, "fresh");
}

#[tokio::test]
async fn test_external_trades_filters_by_source() {
    let hub = hub(10);
    hub.record(trade("chain")).await;
    hub.record(external_trade("ext")).await;

    let externals = hub.external_trades().await;
    assert_eq!(externals.len(), 1);
    assert_eq!(externals[0].hash, "ext");

    assert_eq!(hub.snapshot().await.len(), 2);
}
