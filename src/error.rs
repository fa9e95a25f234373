//! Crate-level error types.
//!
//! [`SwapfeedError`] unifies every error source (configuration, WebSocket,
//! JSON, HTTP, filesystem) behind a single enum so callers can match on the
//! variant they care about while still using the `?` operator for easy
//! propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SwapfeedError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum SwapfeedError {
    /// A configuration value was missing or could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An HTTP request to the chain RPC endpoint failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading or writing the history snapshot file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The chain RPC endpoint returned an error response.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// An inbound message did not have the expected shape.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}
