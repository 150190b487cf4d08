//! Acceptor loop
//!
//! Binds the listening socket, owns the registry handle and spawns one
//! session task per accepted connection.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::ChatError;
use crate::registry::Registry;
use crate::session::Session;

/// The chat server: a listener plus the shared registry
pub struct ChatServer {
    listener: TcpListener,
    registry: Registry,
    config: ServerConfig,
}

impl ChatServer {
    /// Bind `config.addr` and start the registry actor
    pub async fn bind(config: ServerConfig) -> Result<Self, ChatError> {
        let listener = TcpListener::bind(config.addr)
            .await
            .map_err(|source| ChatError::Bind {
                addr: config.addr,
                source,
            })?;

        Ok(Self::with_listener(listener, Registry::spawn(), config))
    }

    /// Build from an already bound listener and an existing registry
    pub fn with_listener(listener: TcpListener, registry: Registry, config: ServerConfig) -> Self {
        Self {
            listener,
            registry,
            config,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle to the registry shared by every session
    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    /// Accept connections until the listener fails fatally
    pub async fn run(self) -> Result<(), ChatError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Accept connections until `shutdown` resolves or the listener fails fatally
    ///
    /// Sessions already running keep going after this returns; only new
    /// connections stop being accepted.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ChatError>
    where
        F: Future<Output = ()> + Send,
    {
        let ChatServer {
            listener,
            registry,
            config,
        } = self;
        tokio::pin!(shutdown);

        if let Ok(addr) = listener.local_addr() {
            info!("Chat server listening on {}", addr);
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Acceptor shutting down");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        info!("New connection from {}", peer);
                        spawn_session(stream, peer, &registry, &config);
                    }
                    Err(e) if is_listener_fatal(&e) => {
                        error!("Listener failed: {}", e);
                        return Err(e.into());
                    }
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                    }
                },
            }
        }

        Ok(())
    }
}

fn spawn_session(stream: TcpStream, peer: SocketAddr, registry: &Registry, config: &ServerConfig) {
    let session = Session::new(Some(peer), registry.clone(), config);

    tokio::spawn(async move {
        let id = session.id();
        match session.run(Connection::new(stream)).await {
            Ok(()) => {}
            Err(ChatError::EmptyUsername) => {}
            Err(e) => warn!("Session {} ended with error: {}", id, e),
        }
    });
}

/// Whether an accept error means the listening socket itself is unusable
///
/// Per-connection failures (reset or aborted before accept, descriptor
/// exhaustion, interrupts) are transient.
fn is_listener_fatal(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::InvalidInput
            | io::ErrorKind::NotConnected
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::Unsupported
    )
}
