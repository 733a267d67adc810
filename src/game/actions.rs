//! Player actions
//!
//! Room entry, inbox delivery and permission grants.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::game::item::ItemDescriptor;
use crate::game::persistence::NewMail;
use crate::game::player::Player;
use crate::game::services::Services;
use crate::game::{MailId, PlayerId, RoomId};
use crate::protocol::{strip_separators, XtMessage};

/// Sender name used for system mail
pub const SYSTEM_SENDER: &str = "sys";

/// Who a piece of mail comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSender {
    pub name: String,
    pub id: Option<PlayerId>,
}

impl MailSender {
    pub fn player(name: &str, id: PlayerId) -> Self {
        Self {
            name: name.to_string(),
            id: Some(id),
        }
    }
}

impl Default for MailSender {
    fn default() -> Self {
        Self {
            name: SYSTEM_SENDER.to_string(),
            id: None,
        }
    }
}

pub struct PlayerActions {
    services: Services,
}

impl PlayerActions {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Move a player into a room
    pub async fn join_room(&self, player: &Player, room_id: RoomId, room_name: &str) -> Result<()> {
        let _state = player.lock().await;

        self.services.rooms.add_player(room_id, player.id).await?;
        player.set_room(Some(room_id));

        self.services
            .audit
            .record(&format!("{} joined room '{}'", player.username, room_name));

        debug!(player_id = player.id, room_id, "Joined room");
        Ok(())
    }

    /// Take a player out of their room (disconnect)
    pub async fn leave_room(&self, player: &Player) -> Result<()> {
        let _state = player.lock().await;

        if let Some(room_id) = player.room() {
            self.services.rooms.remove_player(player.id).await?;
            player.set_room(None);
            debug!(player_id = player.id, room_id, "Left room");
        }
        Ok(())
    }

    /// Deliver a postcard to the player's inbox
    pub async fn send_inbox(
        &self,
        player: &Player,
        postcard: &ItemDescriptor,
        sender: &MailSender,
        details: &str,
    ) -> Result<MailId> {
        let _state = player.lock().await;

        let details = strip_separators(details);
        let sent_at = Utc::now();
        let mail = NewMail {
            recipient_id: player.id,
            sender_id: sender.id,
            postcard_id: postcard.id,
            details: details.clone(),
            sent_at,
        };
        let mail_id = self.services.store.insert_mail(&mail).await?;

        let message = XtMessage::new("mr")
            .arg(strip_separators(&sender.name))
            .arg(0)
            .arg(postcard.id)
            .arg(&details)
            .arg(sent_at.timestamp())
            .arg(mail_id);
        if let Err(e) = self
            .services
            .notifier
            .send_to_player(player.id, &message)
            .await
        {
            warn!(player_id = player.id, mail_id, error = %e, "Failed to deliver mail notification");
        }

        debug!(
            player_id = player.id,
            postcard_id = postcard.id,
            mail_id,
            "Mail sent"
        );
        Ok(mail_id)
    }

    /// Grant a named permission. Granting one the player already holds
    /// changes nothing.
    pub async fn grant_permission(&self, player: &Player, permission: &str) -> Result<bool> {
        let mut state = player.lock().await;

        if state.permissions.contains(permission) {
            return Ok(true);
        }

        self.services
            .store
            .insert_permission(player.id, permission)
            .await?;
        state.permissions.insert(permission.to_string());

        self.services.audit.record(&format!(
            "{} was assigned permission '{}'",
            player.username, permission
        ));

        info!(player_id = player.id, permission = %permission, "Permission granted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    use crate::game::persistence::PlayerStore;
    use crate::game::room::RoomDirectory;
    use crate::game::services::MemoryServices;
    use crate::net::notifier::SessionNotifier;
    use crate::net::session::SessionManager;

    async fn setup() -> (MemoryServices, PlayerActions, Player, mpsc::Receiver<Vec<u8>>) {
        let memory = MemoryServices::new();
        let sessions = Arc::new(SessionManager::new());
        let notifier = Arc::new(SessionNotifier::new(sessions.clone(), memory.rooms.clone()));
        let actions = PlayerActions::new(memory.services(notifier));

        let (tx, rx) = mpsc::channel(16);
        let session = sessions
            .create_session("127.0.0.1:4000".parse().unwrap(), tx)
            .unwrap();
        let record = memory.store.load_or_create("pingu").await.unwrap();
        sessions.bind_player(session.id, record.id).unwrap();
        let player = Player::from_record(record, session.id);

        (memory, actions, player, rx)
    }

    #[tokio::test]
    async fn test_join_room() {
        let (memory, actions, player, _rx) = setup().await;

        actions.join_room(&player, 100, "Town").await.unwrap();
        actions.join_room(&player, 200, "Plaza").await.unwrap();

        assert_eq!(player.room(), Some(200));
        assert!(memory.rooms.occupants(100).await.is_empty());
        assert_eq!(memory.rooms.occupants(200).await, vec![player.id]);
        assert_eq!(
            memory.audit.lines(),
            vec![
                "pingu joined room 'Town'".to_string(),
                "pingu joined room 'Plaza'".to_string()
            ]
        );

        actions.leave_room(&player).await.unwrap();
        assert_eq!(player.room(), None);
    }

    #[tokio::test]
    async fn test_send_inbox_from_system() {
        let (memory, actions, player, mut rx) = setup().await;
        let postcard = ItemDescriptor::new(125, "Welcome");

        let mail_id = actions
            .send_inbox(&player, &postcard, &MailSender::default(), "")
            .await
            .unwrap();

        let stored = memory.store.mail_for(player.id);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, mail_id);
        assert_eq!(stored[0].1.sender_id, None);
        assert_eq!(stored[0].1.postcard_id, 125);

        let frame = rx.recv().await.unwrap();
        let text = String::from_utf8(frame[..frame.len() - 1].to_vec()).unwrap();
        let expected = format!(
            "%xt%mr%-1%sys%0%125%%{}%{}%",
            stored[0].1.sent_at.timestamp(),
            mail_id
        );
        assert_eq!(text, expected);
    }

    #[tokio::test]
    async fn test_send_inbox_keeps_payload_fields() {
        let (memory, actions, player, mut rx) = setup().await;
        let postcard = ItemDescriptor::new(125, "Welcome");

        let mail_id = actions
            .send_inbox(&player, &postcard, &MailSender::player("pi%nga", 102), "50% off%")
            .await
            .unwrap();

        let stored = memory.store.mail_for(player.id);
        assert_eq!(stored[0].1.details, "50 off");

        let frame = rx.recv().await.unwrap();
        let text = String::from_utf8(frame[..frame.len() - 1].to_vec()).unwrap();
        let expected = format!(
            "%xt%mr%-1%pinga%0%125%50 off%{}%{}%",
            stored[0].1.sent_at.timestamp(),
            mail_id
        );
        assert_eq!(text, expected);
    }

    #[tokio::test]
    async fn test_grant_permission_once() {
        let (memory, actions, player, _rx) = setup().await;

        assert!(actions.grant_permission(&player, "moderator").await.unwrap());
        assert!(actions.grant_permission(&player, "moderator").await.unwrap());

        assert_eq!(player.snapshot().await.permissions.len(), 1);
        assert_eq!(memory.audit.len(), 1);
        assert!(memory
            .store
            .record(player.id)
            .unwrap()
            .permissions
            .contains("moderator"));
    }
}
