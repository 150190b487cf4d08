//! Client-side driver
//!
//! Runs a listen loop and a send loop concurrently over one connection.
//! The console (or any other front end) talks to the driver through two
//! channels: it feeds typed lines into `input` and renders the
//! `ClientEvent`s that come back.

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::connection::{Connection, LineReader, LineWriter};
use crate::error::ChatError;
use crate::message;

/// Shown when the user submits an empty message
pub const EMPTY_MESSAGE_PROMPT: &str = "Message cannot be empty. Please type something.";

/// Driver -> front end notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A line broadcast by the server
    Line(String),
    /// A connection status string for display
    Status(String),
    /// The server closed the connection or a read failed
    Disconnected,
}

/// Client driver bound to one connection
pub struct ClientDriver {
    connection: Connection,
    username: String,
}

impl ClientDriver {
    /// Connect and perform the username handshake
    pub async fn connect(config: &ClientConfig) -> Result<Self, ChatError> {
        let connection = Connection::connect(config.addr).await?;
        info!("Connected to {}", config.addr);
        Self::handshake(connection, config.username.clone()).await
    }

    /// Send the bare username as the first line
    pub async fn handshake(mut connection: Connection, username: String) -> Result<Self, ChatError> {
        connection.write_line(&username).await?;
        Ok(Self {
            connection,
            username,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Run both loops until the connection ends or input is exhausted
    pub async fn run(
        self,
        input: mpsc::Receiver<String>,
        events: mpsc::Sender<ClientEvent>,
    ) -> Result<(), ChatError> {
        let ClientDriver {
            connection,
            username,
        } = self;
        let (reader, writer) = connection.into_split();
        let (closed_tx, closed_rx) = watch::channel(false);

        let _ = events
            .send(ClientEvent::Status(format!("Joined the chat as {}", username)))
            .await;

        let listen = tokio::spawn(listen_loop(reader, events.clone(), closed_tx));
        let send = send_loop(writer, username, input, events, closed_rx);

        let (listen_result, send_result) = tokio::join!(listen, send);
        if let Err(e) = listen_result {
            warn!("Listen loop panicked: {}", e);
        }
        send_result
    }
}

/// Hand every inbound line to the front end; on end of stream signal the send loop
async fn listen_loop(
    mut reader: LineReader,
    events: mpsc::Sender<ClientEvent>,
    closed: watch::Sender<bool>,
) {
    loop {
        match reader.read_line().await {
            Ok(Some(line)) => {
                if events.send(ClientEvent::Line(line)).await.is_err() {
                    debug!("Event receiver dropped, ending listen loop");
                    break;
                }
            }
            Ok(None) => {
                info!("Server closed the connection");
                break;
            }
            Err(e) => {
                warn!("Read from server failed: {}", e);
                break;
            }
        }
    }

    reader.close();
    let _ = closed.send(true);
    let _ = events.send(ClientEvent::Disconnected).await;
}

/// Forward typed lines as "<username>: <line>"
///
/// Ends when input is exhausted, a write fails, or the listen loop reports
/// the connection closed.
async fn send_loop(
    mut writer: LineWriter,
    username: String,
    mut input: mpsc::Receiver<String>,
    events: mpsc::Sender<ClientEvent>,
    mut closed: watch::Receiver<bool>,
) -> Result<(), ChatError> {
    let mut outcome = Ok(());

    loop {
        let line = tokio::select! {
            line = input.recv() => line,
            _ = closed.changed() => {
                debug!("Connection closed, ending send loop");
                break;
            }
        };

        let Some(line) = line else {
            debug!("Input exhausted, leaving chat");
            break;
        };

        if message::is_blank(&line) {
            let _ = events
                .send(ClientEvent::Status(EMPTY_MESSAGE_PROMPT.to_string()))
                .await;
            continue;
        }

        if let Err(e) = writer.write_line(&message::chat_line(&username, &line)).await {
            warn!("Write to server failed: {}", e);
            outcome = Err(e);
            break;
        }
    }

    if let Err(e) = writer.close().await {
        debug!("Closing write half failed: {}", e);
    }
    outcome
}
