//! Real-time swap event feed.
//!
//! Ingests pair-contract swap logs from a chain node plus an external
//! transaction stream, normalizes both into canonical trades, keeps a
//! bounded most-recent-first history, and fans each new trade out to
//! connected WebSocket subscribers (one snapshot at attach, then the live
//! stream).

pub mod backfill;
pub mod config;
pub mod decoder;
pub mod error;
pub mod feed;
pub mod history;
pub mod models;
pub mod server;
pub mod upstream;

pub use error::{Result, SwapfeedError};
