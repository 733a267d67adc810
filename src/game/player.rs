//! Player module
//!
//! Manages logged-in players and their state including:
//! - Currency, inventories, equipment and permissions
//! - Pending buddy requests
//! - The room the player occupies
//! - Player session association
//!
//! Mutable state sits behind an async mutex. Every mutating operation holds it
//! for its whole duration, so requests for one player never interleave.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::error::{GameError, Result};
use crate::game::currency::CurrencyAccount;
use crate::game::equipment::Equipment;
use crate::game::inventory::Inventories;
use crate::game::persistence::PlayerRecord;
use crate::game::{PlayerId, RoomId};
use crate::net::session::SessionId;

/// Mutable player state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerState {
    pub account: CurrencyAccount,
    pub inventories: Inventories,
    pub equipment: Equipment,
    pub permissions: HashSet<String>,
    buddy_requests: HashSet<PlayerId>,
}

impl PlayerState {
    /// Record a pending buddy request from `from`
    pub fn add_buddy_request(&mut self, from: PlayerId) -> bool {
        self.buddy_requests.insert(from)
    }

    pub fn remove_buddy_request(&mut self, from: PlayerId) -> bool {
        self.buddy_requests.remove(&from)
    }

    pub fn has_buddy_request(&self, from: PlayerId) -> bool {
        self.buddy_requests.contains(&from)
    }

    pub fn buddy_request_count(&self) -> usize {
        self.buddy_requests.len()
    }
}

/// A logged-in player
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub session_id: SessionId,
    state: Mutex<PlayerState>,
    room: RwLock<Option<RoomId>>,
}

impl Player {
    /// Build a player from its persisted record
    pub fn from_record(record: PlayerRecord, session_id: SessionId) -> Self {
        Self {
            id: record.id,
            username: record.username,
            session_id,
            state: Mutex::new(PlayerState {
                account: record.account,
                inventories: record.inventories,
                equipment: record.equipment,
                permissions: record.permissions,
                buddy_requests: HashSet::new(),
            }),
            room: RwLock::new(None),
        }
    }

    /// Take exclusive access to the mutable state
    pub async fn lock(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock().await
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> PlayerState {
        self.state.lock().await.clone()
    }

    /// Room the player is in
    pub fn room(&self) -> Option<RoomId> {
        *self.room.read()
    }

    pub fn set_room(&self, room_id: Option<RoomId>) {
        *self.room.write() = room_id;
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("session_id", &self.session_id)
            .field("room", &self.room())
            .finish_non_exhaustive()
    }
}

/// Registry of logged-in players
pub struct PlayerManager {
    /// Map of player ID to player
    players: DashMap<PlayerId, Arc<Player>>,
    /// Map of session ID to player ID
    session_to_id: DashMap<SessionId, PlayerId>,
    /// Maximum player count
    max_players: usize,
}

impl PlayerManager {
    pub fn new(max_players: usize) -> Self {
        Self {
            players: DashMap::new(),
            session_to_id: DashMap::new(),
            max_players,
        }
    }

    /// Register a player loaded from the store
    pub fn register(&self, session_id: SessionId, record: PlayerRecord) -> Result<Arc<Player>> {
        if self.players.contains_key(&record.id) {
            return Err(GameError::InvalidPlayerState(format!(
                "{} is already logged in",
                record.username
            ))
            .into());
        }
        if self.is_full() {
            return Err(GameError::WorldFull.into());
        }

        let player = Arc::new(Player::from_record(record, session_id));

        self.players.insert(player.id, player.clone());
        self.session_to_id.insert(session_id, player.id);

        info!(
            player_id = player.id,
            username = %player.username,
            session_id = session_id,
            "Player registered"
        );

        Ok(player)
    }

    /// Unregister a player
    pub fn unregister(&self, player_id: PlayerId) -> Option<Arc<Player>> {
        let (_, player) = self.players.remove(&player_id)?;
        self.session_to_id.remove(&player.session_id);

        info!(
            player_id = player_id,
            username = %player.username,
            "Player unregistered"
        );

        Some(player)
    }

    pub fn get(&self, player_id: PlayerId) -> Option<Arc<Player>> {
        self.players.get(&player_id).map(|r| r.clone())
    }

    /// Get a player by session ID
    pub fn get_by_session(&self, session_id: SessionId) -> Option<Arc<Player>> {
        self.session_to_id
            .get(&session_id)
            .and_then(|id| self.get(*id))
    }

    pub fn count(&self) -> usize {
        self.players.len()
    }

    /// Check if the server is full
    pub fn is_full(&self) -> bool {
        self.count() >= self.max_players
    }
}

impl Default for PlayerManager {
    fn default() -> Self {
        Self::new(500)
    }
}
