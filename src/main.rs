use std::sync::Arc;

use tracing::{info, warn};

use swapfeed::backfill::{self, RpcClient};
use swapfeed::config::fetch_config;
use swapfeed::decoder::SwapDecoder;
use swapfeed::feed::FeedHub;
use swapfeed::history;
use swapfeed::models::TradeSource;
use swapfeed::server::{self, AppState};
use swapfeed::SwapfeedError;
use swapfeed::upstream::Subscription;
use swapfeed::upstream::chain::ChainTransport;
use swapfeed::upstream::external::ExternalTransport;

#[tokio::main]
async fn main() -> Result<(), SwapfeedError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let config = fetch_config()?;

    let hub = Arc::new(FeedHub::new(
        config.feed.history_capacity,
        config.feed.attach_debounce,
        config.snapshot_path.clone(),
    ));

    // Restore the persisted history, if any, before going live.
    if let Some(path) = &config.snapshot_path {
        if path.exists() {
            match history::read_snapshot(path) {
                Ok(trades) => {
                    info!(trades = trades.len(), "Restored history snapshot");
                    hub.replace_history(trades).await;
                }
                Err(e) => warn!(error = %e, "Failed to read history snapshot"),
            }
        }
    }

    let chain = &config.chain;
    let mut pairs = vec![(
        chain.pair_v1_address.clone(),
        SwapDecoder::new(
            TradeSource::PairV1,
            chain.token_decimals,
            chain.native_decimals,
        ),
    )];
    if let Some(address) = &chain.pair_v2_address {
        pairs.push((
            address.clone(),
            SwapDecoder::new(
                TradeSource::PairV2,
                chain.token_decimals,
                chain.native_decimals,
            ),
        ));
    }

    let rpc = RpcClient::new(chain.http_url.clone());
    if hub.is_empty().await {
        backfill::run(&rpc, &pairs, config.feed.backfill_blocks, &hub).await;
    }

    // One subscription task per upstream source; they share nothing but the hub.
    for (address, decoder) in &pairs {
        let name = decoder.source().as_str();
        let transport = ChainTransport::new(chain.ws_url.clone(), address.clone(), *decoder);
        let subscription =
            Subscription::new(name, transport, hub.clone(), config.feed.reconnect_delay);
        tokio::spawn(subscription.run());
    }
    if let Some(url) = &config.external_ws_url {
        let transport = ExternalTransport::new(url.clone());
        let subscription = Subscription::new(
            "external",
            transport,
            hub.clone(),
            config.feed.reconnect_delay,
        );
        tokio::spawn(subscription.run());
    }

    let state = Arc::new(AppState::new(
        hub,
        rpc,
        pairs,
        config.feed.backfill_blocks,
    ));
    server::serve(config.bind_addr, state).await
}
