//! Outbound message queue between the game engine and the network layer
//!
//! The engine never writes to sockets. It enqueues [`Outbound`] messages on
//! an unbounded channel and the network sender task delivers them.

use log::error;
use tokio::sync::mpsc;

/// Messages sent from the engine to the network sender task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    ToPlayer { name: String, text: String },
    Broadcast { text: String },
}

/// Cloneable sending side of the outbound queue
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl SessionHandle {
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    /// Creates a handle together with the receiver the sender task drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send_to_player(&self, name: &str, text: impl Into<String>) {
        let message = Outbound::ToPlayer {
            name: name.to_string(),
            text: text.into(),
        };
        if let Err(e) = self.tx.send(message) {
            error!("Failed to queue message for {}: {}", name, e);
        }
    }

    pub fn broadcast(&self, text: impl Into<String>) {
        if let Err(e) = self.tx.send(Outbound::Broadcast { text: text.into() }) {
            error!("Failed to queue broadcast: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_arrive_in_order() {
        let (session, mut rx) = SessionHandle::channel();
        session.send_to_player("alice", "OK$PING$1");
        session.broadcast("TURN$bob");

        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::ToPlayer {
                name: "alice".to_string(),
                text: "OK$PING$1".to_string()
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Broadcast {
                text: "TURN$bob".to_string()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_queue_does_not_panic() {
        let (session, rx) = SessionHandle::channel();
        drop(rx);
        session.broadcast("SYNC$");
        session.send_to_player("alice", "TURN$alice");
    }
}
