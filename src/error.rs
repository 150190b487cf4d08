//! Error types for the chat server
//!
//! Defines application-level errors and outbox send errors.
//! Uses thiserror for ergonomic error definitions.

use std::net::SocketAddr;

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Application-level errors
///
/// Connection-scoped variants end a single session; `Bind` and a fatal
/// `Io` from the accept loop end the acceptor.
#[derive(Debug, Error)]
pub enum ChatError {
    /// IO error on a socket or the listener
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The listening endpoint could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Line framing error (oversized line or underlying IO failure)
    #[error("Line codec error: {0}")]
    Codec(#[from] LinesCodecError),

    /// Write attempted on a connection that was already closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Handshake line was empty, blank, or missing
    #[error("Username cannot be empty")]
    EmptyUsername,

    /// The registry actor is gone (internal channel broken)
    #[error("Registry closed")]
    RegistryClosed,
}

/// Outbox send errors
///
/// Occurs when the registry delivers to a session whose write task has ended.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
