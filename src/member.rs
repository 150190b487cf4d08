//! Registry entry for one registered session
//!
//! Holds the session's identity and the sender half of its outbox. The
//! session's write task owns the receiving half and the socket.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::types::{SessionId, Username};

/// Registered chat participant
#[derive(Debug, Clone)]
pub struct Member {
    /// Unique identifier of the owning session
    pub id: SessionId,
    /// Username given at handshake
    pub username: Username,
    /// Registry -> session line channel
    pub outbox: mpsc::Sender<String>,
}

impl Member {
    pub fn new(id: SessionId, username: Username, outbox: mpsc::Sender<String>) -> Self {
        Self {
            id,
            username,
            outbox,
        }
    }

    /// Queue a line for this member's connection
    ///
    /// Returns an error if the write task has ended (connection gone).
    pub async fn send(&self, line: String) -> Result<(), SendError> {
        self.outbox
            .send(line)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_member_send() {
        let (tx, mut rx) = mpsc::channel(32);
        let member = Member::new(SessionId::new(), Username::parse("alice").unwrap(), tx);

        member.send("hello".to_string()).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_member_send_after_close() {
        let (tx, rx) = mpsc::channel(32);
        let member = Member::new(SessionId::new(), Username::parse("bob").unwrap(), tx);
        drop(rx);

        assert!(matches!(
            member.send("hello".to_string()).await,
            Err(SendError::ChannelClosed)
        ));
    }
}
