//! Room membership
//!
//! Tracks which players occupy which room. A player is in at most one room;
//! adding them to a new room takes them out of the previous one.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::Result;
use crate::game::{PlayerId, RoomId};

/// Room membership collaborator
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Put a player in a room
    async fn add_player(&self, room_id: RoomId, player_id: PlayerId) -> Result<()>;

    /// Take a player out of whatever room they are in
    async fn remove_player(&self, player_id: PlayerId) -> Result<()>;

    /// Players currently in a room
    async fn occupants(&self, room_id: RoomId) -> Vec<PlayerId>;
}

/// In-process room registry
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, HashSet<PlayerId>>,
    player_rooms: DashMap<PlayerId, RoomId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn leave(&self, player_id: PlayerId) -> Option<RoomId> {
        let (_, room_id) = self.player_rooms.remove(&player_id)?;
        if let Some(mut occupants) = self.rooms.get_mut(&room_id) {
            occupants.remove(&player_id);
        }
        self.rooms.remove_if(&room_id, |_, occupants| occupants.is_empty());
        Some(room_id)
    }
}

#[async_trait]
impl RoomDirectory for RoomRegistry {
    async fn add_player(&self, room_id: RoomId, player_id: PlayerId) -> Result<()> {
        if let Some(previous) = self.leave(player_id) {
            debug!(player_id, from = previous, to = room_id, "Player changed room");
        }
        self.rooms.entry(room_id).or_default().insert(player_id);
        self.player_rooms.insert(player_id, room_id);
        Ok(())
    }

    async fn remove_player(&self, player_id: PlayerId) -> Result<()> {
        if let Some(room_id) = self.leave(player_id) {
            debug!(player_id, room_id, "Player left room");
        }
        Ok(())
    }

    async fn occupants(&self, room_id: RoomId) -> Vec<PlayerId> {
        self.rooms
            .get(&room_id)
            .map(|occupants| occupants.iter().copied().collect())
            .unwrap_or_default()
    }
}
