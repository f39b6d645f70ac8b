//! WebSocket client
//!
//! Reconnecting read-only client used by streaming price providers.

mod client;
mod types;

pub use client::WsClient;
pub use types::{WsConfig, WsError, WsMessage};
