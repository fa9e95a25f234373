//! HTTP and WebSocket serving surface.
//!
//! One router: `/ws` speaks the subscriber protocol (one history snapshot,
//! then one message per trade), `/trades/{address}` and `/transactions`
//! answer one-shot queries, `/health` feeds the keep-alive pinger. The
//! subscriber handler only shuttles between its hub channel and the socket;
//! all fan-out policy lives in [`FeedHub`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::backfill::{self, RpcClient};
use crate::decoder::SwapDecoder;
use crate::feed::FeedHub;
use crate::models::Trade;

/// Shared state behind every route.
pub struct AppState {
    pub hub: Arc<FeedHub>,
    pub rpc: RpcClient,
    /// Tracked pairs with their decoders, for backfill and address queries.
    pub pairs: Vec<(String, SwapDecoder)>,
    pub lookback_blocks: u64,
    /// Serializes attach-triggered backfills so concurrent first
    /// subscribers run the query once.
    backfill_gate: Mutex<()>,
}

impl AppState {
    #[must_use]
    pub fn new(
        hub: Arc<FeedHub>,
        rpc: RpcClient,
        pairs: Vec<(String, SwapDecoder)>,
        lookback_blocks: u64,
    ) -> Self {
        Self {
            hub,
            rpc,
            pairs,
            lookback_blocks,
            backfill_gate: Mutex::new(()),
        }
    }
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/trades/{address}", get(trades_for_address))
        .route("/transactions", get(external_transactions))
        .layer(cors)
        .with_state(state)
}

/// Binds and serves until the process exits.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Serving subscribers");
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_subscriber(socket, state, addr.ip().to_string()))
}

async fn handle_subscriber(socket: WebSocket, state: Arc<AppState>, origin: String) {
    // An empty history at attach time means backfill never ran or found
    // nothing; give it another chance before serving the snapshot.
    if state.hub.is_empty().await {
        let _gate = state.backfill_gate.lock().await;
        if state.hub.is_empty().await {
            backfill::run(&state.rpc, &state.pairs, state.lookback_blocks, &state.hub).await;
        }
    }

    let channel = match state.hub.attach(&origin).await {
        Ok(channel) => channel,
        Err(rejected) => {
            debug!(error = %rejected, "Attach rejected");
            return;
        }
    };
    let id = channel.id;
    let mut rx = channel.rx;
    info!(origin = %origin, subscriber = id, "Subscriber attached");

    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            outbound = rx.recv() => {
                // None: the hub detached us (lagging) or is shutting down
                let Some(message) = outbound else { break };
                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode feed message");
                        break;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }

            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Subscribers only listen; ignore anything they send
                    _ => {}
                }
            }
        }
    }

    state.hub.detach(id).await;
    info!(subscriber = id, "Subscriber detached");
}

async fn trades_for_address(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<Vec<Trade>>, StatusCode> {
    backfill::address_trades(&state.rpc, &state.pairs, state.lookback_blocks, &address)
        .await
        .map(Json)
        .map_err(|e| {
            warn!(error = %e, address = %address, "Address trade query failed");
            StatusCode::BAD_GATEWAY
        })
}

async fn external_transactions(State(state): State<Arc<AppState>>) -> Json<Vec<Trade>> {
    Json(state.hub.external_trades().await)
}
