//! Outbound notifications
//!
//! Delivers XT messages to one player or to everyone in a room through
//! their session channels.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{NetworkError, Result};
use crate::game::room::RoomDirectory;
use crate::game::{PlayerId, RoomId};
use crate::net::session::SessionManager;
use crate::protocol::XtMessage;

/// Message delivery collaborator
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a message to one player
    async fn send_to_player(&self, player_id: PlayerId, message: &XtMessage) -> Result<()>;

    /// Send a message to every occupant of a room
    async fn broadcast_to_room(&self, room_id: RoomId, message: &XtMessage) -> Result<()>;
}

/// Notifier writing frames into session outbound channels
pub struct SessionNotifier {
    sessions: Arc<SessionManager>,
    rooms: Arc<dyn RoomDirectory>,
}

impl SessionNotifier {
    pub fn new(sessions: Arc<SessionManager>, rooms: Arc<dyn RoomDirectory>) -> Self {
        Self { sessions, rooms }
    }
}

#[async_trait]
impl Notifier for SessionNotifier {
    async fn send_to_player(&self, player_id: PlayerId, message: &XtMessage) -> Result<()> {
        let session = self
            .sessions
            .get_by_player(player_id)
            .ok_or(NetworkError::ConnectionClosed)?;

        session.try_send(message.to_frame())?;
        debug!(player_id, opcode = message.opcode(), "Sent message");
        Ok(())
    }

    async fn broadcast_to_room(&self, room_id: RoomId, message: &XtMessage) -> Result<()> {
        let frame = message.to_frame();
        let occupants = self.rooms.occupants(room_id).await;

        for player_id in &occupants {
            let Some(session) = self.sessions.get_by_player(*player_id) else {
                continue;
            };
            // one slow client must not stop the others
            if let Err(e) = session.try_send(frame.clone()) {
                warn!(
                    player_id = *player_id,
                    room_id,
                    error = %e,
                    "Failed to deliver room broadcast"
                );
            }
        }

        debug!(
            room_id,
            opcode = message.opcode(),
            recipients = occupants.len(),
            "Broadcast to room"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::room::RoomRegistry;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_broadcast_reaches_room_only() {
        let sessions = Arc::new(SessionManager::new());
        let rooms = Arc::new(RoomRegistry::new());
        let notifier = SessionNotifier::new(sessions.clone(), rooms.clone());

        let address = "127.0.0.1:1000".parse().unwrap();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let a = sessions.create_session(address, tx_a).unwrap();
        let b = sessions.create_session(address, tx_b).unwrap();
        sessions.bind_player(a.id, 1).unwrap();
        sessions.bind_player(b.id, 2).unwrap();
        rooms.add_player(100, 1).await.unwrap();
        rooms.add_player(200, 2).await.unwrap();

        let message = XtMessage::new("uph").arg(1).arg(413);
        notifier.broadcast_to_room(100, &message).await.unwrap();

        assert_eq!(rx_a.recv().await.unwrap(), message.to_frame());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_to_offline_player() {
        let sessions = Arc::new(SessionManager::new());
        let notifier = SessionNotifier::new(sessions, Arc::new(RoomRegistry::new()));

        let result = notifier.send_to_player(7, &XtMessage::new("ai")).await;
        assert!(result.is_err());
    }
}
