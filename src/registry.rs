//! Registry actor implementation
//!
//! The set of registered sessions lives inside a single actor task. Add,
//! remove and broadcast are commands on one mpsc channel, so they run one
//! at a time and a broadcast always sees a complete membership snapshot.
//! `Registry` is the cloneable handle injected into every session.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::member::Member;
use crate::types::SessionId;

/// Channel buffer size for registry commands
pub const COMMAND_BUFFER_SIZE: usize = 256;

/// Commands sent from sessions to the registry actor
#[derive(Debug)]
pub enum RegistryCommand {
    /// Insert a member
    Add {
        member: Member,
        ack: oneshot::Sender<()>,
    },
    /// Remove a member; replies with the removed entry, if any
    Remove {
        id: SessionId,
        ack: oneshot::Sender<Option<Member>>,
    },
    /// Deliver a line to every member except `exclude`;
    /// replies with the number of members that accepted it
    Broadcast {
        line: String,
        exclude: Option<SessionId>,
        ack: oneshot::Sender<usize>,
    },
    /// Report the number of members
    Len { reply: oneshot::Sender<usize> },
}

/// The registry actor
///
/// Owns the membership map and processes commands until every handle is dropped.
pub struct RegistryActor {
    /// Registered members: SessionId -> Member
    members: HashMap<SessionId, Member>,
    /// Command receiver channel
    receiver: mpsc::Receiver<RegistryCommand>,
}

impl RegistryActor {
    /// Create a new actor with the given command receiver
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>) -> Self {
        Self {
            members: HashMap::new(),
            receiver,
        }
    }

    /// Run the registry event loop
    pub async fn run(mut self) {
        debug!("Registry started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        debug!("Registry shutting down");
    }

    async fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Add { member, ack } => {
                self.handle_add(member);
                let _ = ack.send(());
            }
            RegistryCommand::Remove { id, ack } => {
                let removed = self.handle_remove(id);
                let _ = ack.send(removed);
            }
            RegistryCommand::Broadcast { line, exclude, ack } => {
                let delivered = self.handle_broadcast(line, exclude).await;
                let _ = ack.send(delivered);
            }
            RegistryCommand::Len { reply } => {
                let _ = reply.send(self.members.len());
            }
        }
    }

    fn handle_add(&mut self, member: Member) {
        info!("Session {} registered as '{}'", member.id, member.username);
        self.members.insert(member.id, member);
        debug!("Total sessions: {}", self.members.len());
    }

    fn handle_remove(&mut self, id: SessionId) -> Option<Member> {
        let removed = self.members.remove(&id);
        if let Some(member) = &removed {
            info!("Session {} ('{}') unregistered", id, member.username);
            debug!("Total sessions: {}", self.members.len());
        }
        removed
    }

    /// Fan a line out to the current members
    ///
    /// A closed outbox is skipped; that session's own teardown removes it.
    async fn handle_broadcast(&self, line: String, exclude: Option<SessionId>) -> usize {
        let mut delivered = 0;

        for member in self.members.values() {
            if Some(member.id) == exclude {
                continue;
            }

            match member.send(line.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("Delivery to session {} failed: {}", member.id, e);
                }
            }
        }

        delivered
    }
}

/// Handle to the registry actor
#[derive(Debug, Clone)]
pub struct Registry {
    sender: mpsc::Sender<RegistryCommand>,
}

impl Registry {
    /// Wrap an existing command sender
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Create the actor, spawn it on the current runtime and return its handle
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        tokio::spawn(RegistryActor::new(rx).run());
        Self::new(tx)
    }

    /// Register a member. Duplicate usernames are allowed.
    pub async fn add(&self, member: Member) -> Result<(), ChatError> {
        self.request(|ack| RegistryCommand::Add { member, ack }).await
    }

    /// Unregister a session. Removing an absent id is a no-op returning `None`.
    pub async fn remove(&self, id: SessionId) -> Result<Option<Member>, ChatError> {
        self.request(|ack| RegistryCommand::Remove { id, ack }).await
    }

    /// Deliver a line to every registered session, sender included
    pub async fn broadcast(&self, line: impl Into<String>) -> Result<usize, ChatError> {
        let line = line.into();
        self.request(|ack| RegistryCommand::Broadcast {
            line,
            exclude: None,
            ack,
        })
        .await
    }

    /// Deliver a line to every registered session except `exclude`
    pub async fn broadcast_except(
        &self,
        line: impl Into<String>,
        exclude: SessionId,
    ) -> Result<usize, ChatError> {
        let line = line.into();
        self.request(|ack| RegistryCommand::Broadcast {
            line,
            exclude: Some(exclude),
            ack,
        })
        .await
    }

    /// Number of registered sessions
    pub async fn len(&self) -> Result<usize, ChatError> {
        self.request(|reply| RegistryCommand::Len { reply }).await
    }

    pub async fn is_empty(&self) -> Result<bool, ChatError> {
        Ok(self.len().await? == 0)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> Result<T, ChatError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| ChatError::RegistryClosed)?;
        rx.await.map_err(|_| ChatError::RegistryClosed)
    }
}
