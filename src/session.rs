//! Server-side session for one connected client
//!
//! A session walks `Connecting -> Handshaking -> Active -> Closed`. The
//! first line read is the username; a blank or missing one is rejected
//! and the connection closed without touching the registry. Once active,
//! every non-blank line is broadcast verbatim to all registered sessions,
//! the sender included.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::{Connection, LineReader, LineWriter};
use crate::error::ChatError;
use crate::member::Member;
use crate::message;
use crate::registry::Registry;
use crate::types::{SessionId, Username};

/// How long teardown waits for queued lines to reach the socket
const WRITE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket accepted, nothing read yet
    Connecting,
    /// Waiting for the username line
    Handshaking,
    /// Registered and relaying lines
    Active,
    /// Terminal
    Closed,
}

/// One chat participant on the server side
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    peer: Option<SocketAddr>,
    state: SessionState,
    username: Option<Username>,
    registry: Registry,
    announce_departures: bool,
    outbox_capacity: usize,
}

impl Session {
    pub fn new(peer: Option<SocketAddr>, registry: Registry, config: &ServerConfig) -> Self {
        Self {
            id: SessionId::new(),
            peer,
            state: SessionState::Connecting,
            username: None,
            registry,
            announce_departures: config.announce_departures,
            outbox_capacity: config.outbox_capacity.max(1),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn username(&self) -> Option<&Username> {
        self.username.as_ref()
    }

    /// Drive the session over `connection` until it closes
    ///
    /// Returns `Err(ChatError::EmptyUsername)` when the handshake is rejected,
    /// or the read error that ended an active session.
    pub async fn run(mut self, connection: Connection) -> Result<(), ChatError> {
        let (mut reader, mut writer) = connection.into_split();
        self.state = SessionState::Handshaking;

        let username = match self.handshake(&mut reader).await {
            Ok(username) => username,
            Err(e) => {
                self.reject(&mut reader, &mut writer, &e).await;
                return Err(e);
            }
        };

        let (outbox_tx, outbox_rx) = mpsc::channel(self.outbox_capacity);
        let mut write_task = tokio::spawn(write_pump(self.id, writer, outbox_rx));
        let write_abort = write_task.abort_handle();

        let member = Member::new(self.id, username.clone(), outbox_tx);
        self.username = Some(username);

        let mut outcome = self.activate(member).await;
        let mut write_finished = false;

        if outcome.is_ok() {
            tokio::select! {
                res = self.read_loop(&mut reader) => {
                    outcome = res;
                }
                _ = &mut write_task => {
                    debug!("Write side of session {} closed", self.id);
                    write_finished = true;
                }
            }
        }

        self.teardown(&mut reader).await;

        if !write_finished && tokio::time::timeout(WRITE_DRAIN_TIMEOUT, write_task).await.is_err() {
            warn!("Session {} did not drain its outbox in time", self.id);
            write_abort.abort();
        }

        info!("Session {} disconnected", self.id);
        outcome
    }

    /// Read the username line
    async fn handshake(&mut self, reader: &mut LineReader) -> Result<Username, ChatError> {
        match reader.read_line().await? {
            Some(line) => Username::parse(&line).ok_or(ChatError::EmptyUsername),
            None => Err(ChatError::EmptyUsername),
        }
    }

    /// Close a connection whose handshake failed
    async fn reject(&mut self, reader: &mut LineReader, writer: &mut LineWriter, err: &ChatError) {
        if matches!(err, ChatError::EmptyUsername) {
            warn!("Session {} ({:?}) rejected: empty username", self.id, self.peer);
            if let Err(e) = writer.write_line(message::EMPTY_USERNAME_REJECTION).await {
                debug!("Could not send rejection to {}: {}", self.id, e);
            }
        }

        reader.close();
        if let Err(e) = writer.close().await {
            debug!("Close after rejection failed for {}: {}", self.id, e);
        }
        self.state = SessionState::Closed;
    }

    /// Register and announce the join to everyone else
    async fn activate(&mut self, member: Member) -> Result<(), ChatError> {
        let notice = message::join_notice(member.username.as_str());
        self.registry.add(member).await?;
        self.state = SessionState::Active;
        info!("Session {} joined from {:?}", self.id, self.peer);

        self.registry.broadcast_except(notice, self.id).await?;
        Ok(())
    }

    /// Relay lines until end of stream or a blank line
    async fn read_loop(&self, reader: &mut LineReader) -> Result<(), ChatError> {
        while let Some(line) = reader.read_line().await? {
            if message::is_blank(&line) {
                debug!("Session {} sent a blank line, closing", self.id);
                break;
            }
            self.registry.broadcast(line).await?;
        }
        Ok(())
    }

    /// Leave the registry and release the read half
    ///
    /// The write half closes once the registry drops its outbox sender.
    /// Safe to call more than once.
    async fn teardown(&mut self, reader: &mut LineReader) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        reader.close();

        match self.registry.remove(self.id).await {
            Ok(Some(member)) => {
                let username = member.username;
                if self.announce_departures {
                    let notice = message::leave_notice(username.as_str());
                    if let Err(e) = self.registry.broadcast(notice).await {
                        warn!("Leave notice for {} failed: {}", self.id, e);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Could not unregister session {}: {}", self.id, e),
        }
    }
}

/// Drain the outbox into the socket, then close the write half
async fn write_pump(id: SessionId, mut writer: LineWriter, mut outbox: mpsc::Receiver<String>) {
    while let Some(line) = outbox.recv().await {
        if let Err(e) = writer.write_line(&line).await {
            debug!("Write to session {} failed: {}", id, e);
            break;
        }
    }
    debug!("Write task ended for session {}", id);

    let _ = writer.close().await;
}
