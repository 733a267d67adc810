//! Session management module
//!
//! Manages client sessions including:
//! - Session lifecycle (creation, tracking, cleanup)
//! - Session state machine (connected -> in game -> disconnected)
//! - Per-session outbound frame channel
//! - Thread-safe session registry keyed by session and player

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{NetworkError, Result, WaddleError};
use crate::game::PlayerId;

/// Unique session identifier
pub type SessionId = u64;

/// Session state in the connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Connected, not logged in yet
    Connected,
    /// Logged in with a loaded player
    InGame,
    /// Session is disconnecting
    Disconnecting,
    /// Session has been disconnected
    Disconnected,
}

impl SessionState {
    /// Check if the session can receive game packets
    pub fn can_receive_game_packets(&self) -> bool {
        matches!(self, SessionState::InGame)
    }

    /// Check if the session is still active (not disconnecting/disconnected)
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            SessionState::Disconnecting | SessionState::Disconnected
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Connected => "Connected",
            SessionState::InGame => "InGame",
            SessionState::Disconnecting => "Disconnecting",
            SessionState::Disconnected => "Disconnected",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A connected client session
pub struct Session {
    /// Unique session identifier
    pub id: SessionId,
    /// Remote address of the client
    pub address: SocketAddr,
    /// Current session state
    state: RwLock<SessionState>,
    /// Player bound to this session (set after login)
    player_id: RwLock<Option<PlayerId>>,
    /// Time of last activity
    last_activity: RwLock<Instant>,
    /// Outbound frame channel
    outbound_tx: Option<mpsc::Sender<Vec<u8>>>,
}

impl Session {
    /// Create a new session without an outbound channel
    pub fn new(id: SessionId, address: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            address,
            state: RwLock::new(SessionState::Connected),
            player_id: RwLock::new(None),
            last_activity: RwLock::new(now),
            outbound_tx: None,
        }
    }

    /// Create a new session with an outbound channel
    pub fn with_channel(
        id: SessionId,
        address: SocketAddr,
        outbound_tx: mpsc::Sender<Vec<u8>>,
    ) -> Self {
        let mut session = Self::new(id, address);
        session.outbound_tx = Some(outbound_tx);
        session
    }

    /// Get the IP address as a string
    pub fn ip(&self) -> String {
        self.address.ip().to_string()
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn set_state(&self, new_state: SessionState) {
        let old_state = {
            let mut state = self.state.write();
            std::mem::replace(&mut *state, new_state)
        };
        if old_state != new_state {
            debug!(
                session_id = self.id,
                from = %old_state,
                to = %new_state,
                "Session state changed"
            );
        }
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        *self.player_id.read()
    }

    /// Update last activity time
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn idle_duration(&self) -> Duration {
        self.last_activity.read().elapsed()
    }

    /// Try to send a frame without blocking
    pub fn try_send(&self, data: Vec<u8>) -> Result<()> {
        if let Some(tx) = &self.outbound_tx {
            tx.try_send(data).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    WaddleError::Network(NetworkError::WriteBufferFull)
                }
                mpsc::error::TrySendError::Closed(_) => {
                    WaddleError::Network(NetworkError::ConnectionClosed)
                }
            })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("state", &self.state())
            .field("player_id", &self.player_id())
            .field("idle_duration", &self.idle_duration())
            .finish()
    }
}

/// Thread-safe session manager
pub struct SessionManager {
    /// Map of session ID to session
    sessions: DashMap<SessionId, Arc<Session>>,
    /// Map of player ID to session ID (for logged-in players)
    player_to_session: DashMap<PlayerId, SessionId>,
    /// Map of IP address to list of session IDs (for connection limiting)
    ip_to_sessions: DashMap<String, Vec<SessionId>>,
    /// Next session ID to assign
    next_id: AtomicU64,
    /// Maximum sessions per IP
    max_per_ip: usize,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::with_limit(10)
    }

    /// Create a session manager with a custom per-IP limit
    pub fn with_limit(max_per_ip: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            player_to_session: DashMap::new(),
            ip_to_sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
            max_per_ip,
        }
    }

    /// Create a session with an outbound channel and register it
    pub fn create_session(
        &self,
        address: SocketAddr,
        outbound_tx: mpsc::Sender<Vec<u8>>,
    ) -> Result<Arc<Session>> {
        let ip = address.ip().to_string();

        let current_count = self.ip_to_sessions.get(&ip).map(|v| v.len()).unwrap_or(0);
        if current_count >= self.max_per_ip {
            warn!(
                ip = %ip,
                count = current_count,
                max = self.max_per_ip,
                "Connection limit exceeded for IP"
            );
            return Err(NetworkError::TooManyConnections(ip).into());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(Session::with_channel(id, address, outbound_tx));

        self.sessions.insert(id, session.clone());
        self.ip_to_sessions.entry(ip).or_default().push(id);

        info!(session_id = id, address = %address, "Session created");

        Ok(session)
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|r| r.clone())
    }

    /// Session a player is logged in on
    pub fn get_by_player(&self, player_id: PlayerId) -> Option<Arc<Session>> {
        self.player_to_session
            .get(&player_id)
            .and_then(|id| self.get(*id))
    }

    /// Bind a player to a session (called after successful login)
    pub fn bind_player(&self, session_id: SessionId, player_id: PlayerId) -> Result<()> {
        let session = self
            .get(session_id)
            .ok_or(NetworkError::SessionNotFound(session_id))?;

        *session.player_id.write() = Some(player_id);
        session.set_state(SessionState::InGame);
        self.player_to_session.insert(player_id, session_id);

        debug!(
            session_id = session_id,
            player_id = player_id,
            "Player bound to session"
        );

        Ok(())
    }

    /// Remove a session
    pub fn remove(&self, id: SessionId) {
        if let Some((_, session)) = self.sessions.remove(&id) {
            session.set_state(SessionState::Disconnected);

            if let Some(player_id) = session.player_id() {
                self.player_to_session
                    .remove_if(&player_id, |_, session_id| *session_id == id);
            }

            let ip = session.ip();
            if let Some(mut sessions) = self.ip_to_sessions.get_mut(&ip) {
                sessions.retain(|&sid| sid != id);
            }
            self.ip_to_sessions.retain(|_, v| !v.is_empty());

            info!(
                session_id = id,
                player_id = ?session.player_id(),
                "Session removed"
            );
        }
    }

    /// Get the count of active sessions
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_address() -> SocketAddr {
        "127.0.0.1:12345".parse().unwrap()
    }

    #[test]
    fn test_session_state_active() {
        assert!(SessionState::Connected.is_active());
        assert!(SessionState::InGame.is_active());
        assert!(!SessionState::Disconnecting.is_active());
        assert!(SessionState::InGame.can_receive_game_packets());
        assert!(!SessionState::Connected.can_receive_game_packets());
    }

    #[test]
    fn test_session_manager_create() {
        let manager = SessionManager::new();
        let (tx, _rx) = mpsc::channel(8);
        let session = manager.create_session(test_address(), tx).unwrap();

        assert_eq!(session.id, 1);
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn test_bind_and_remove() {
        let manager = SessionManager::new();
        let (tx, _rx) = mpsc::channel(8);
        let session = manager.create_session(test_address(), tx).unwrap();

        manager.bind_player(session.id, 101).unwrap();
        assert_eq!(session.state(), SessionState::InGame);
        assert_eq!(manager.get_by_player(101).unwrap().id, session.id);

        manager.remove(session.id);
        assert!(manager.get_by_player(101).is_none());
        assert_eq!(manager.count(), 0);
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_bind_unknown_session() {
        let manager = SessionManager::new();
        assert!(manager.bind_player(42, 101).is_err());
    }

    #[test]
    fn test_session_manager_ip_limit() {
        let manager = SessionManager::with_limit(2);
        let (tx, _rx) = mpsc::channel(8);

        assert!(manager.create_session(test_address(), tx.clone()).is_ok());
        assert!(manager.create_session(test_address(), tx.clone()).is_ok());
        assert!(manager.create_session(test_address(), tx).is_err());
    }

    #[tokio::test]
    async fn test_session_send() {
        let manager = SessionManager::new();
        let (tx, mut rx) = mpsc::channel(8);
        let session = manager.create_session(test_address(), tx).unwrap();

        session.try_send(b"hello".to_vec()).unwrap();
        session.try_send(b"world".to_vec()).unwrap();

        assert_eq!(rx.recv().await.unwrap(), b"hello".to_vec());
        assert_eq!(rx.recv().await.unwrap(), b"world".to_vec());
    }

    #[test]
    fn test_try_send_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let session = Session::with_channel(1, test_address(), tx);
        assert!(matches!(
            session.try_send(vec![0]),
            Err(WaddleError::Network(NetworkError::ConnectionClosed))
        ));
    }
}
