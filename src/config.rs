//! Runtime configuration
//!
//! Plain structs filled from command line arguments by the binary; tests
//! build them directly.

use std::net::SocketAddr;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default per-session outbox capacity (lines)
pub const DEFAULT_OUTBOX_CAPACITY: usize = 32;

fn default_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Server-side settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on; port 0 picks an ephemeral port
    pub addr: SocketAddr,
    /// Broadcast "<name> has left the chat" when a registered session ends
    pub announce_departures: bool,
    /// Lines buffered per session before a broadcast waits on it
    pub outbox_capacity: usize,
}

impl ServerConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            announce_departures: false,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }
}

/// Client-side settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server to connect to
    pub addr: SocketAddr,
    /// Username sent as the handshake line
    pub username: String,
}

impl ClientConfig {
    pub fn new(addr: SocketAddr, username: impl Into<String>) -> Self {
        Self {
            addr,
            username: username.into(),
        }
    }
}
