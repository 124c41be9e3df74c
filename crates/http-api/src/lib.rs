//! HTTP API for a consensus node
//!
//! Exposes the node lifecycle over plain request/response routes:
//! - GET /status - health check
//! - POST /message - inbound message sink
//! - GET /start - start the consensus algorithm
//! - GET /stop - stop the node
//! - GET /getState - state snapshot

pub mod http_server;

pub use http_server::NodeHttpServer;

/// Base port; node `i` listens on `BASE_NODE_PORT + i`
pub const BASE_NODE_PORT: u16 = 3000;

/// Listening address for node `node_id`
pub fn node_addr(base_port: u16, node_id: u32) -> String {
    format!("127.0.0.1:{}", base_port as u32 + node_id)
}
