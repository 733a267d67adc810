//! Connection handler module
//!
//! Handles the lifecycle of client connections including:
//! - Session setup with an outbound frame channel and writer task
//! - NUL-delimited XT framing
//! - Login and command routing
//! - Rejection codes for refused purchases
//! - Cleanup on disconnect (room exit, player unregistration)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

use crate::error::{ClientErrorCode, GameError, NetworkError, ProtocolError, Result, WaddleError};
use crate::game::category::{Category, StackRule};
use crate::game::equipment::EquipmentSlot;
use crate::game::inventory::InventoryKind;
use crate::game::player::Player;
use crate::game::{ItemId, RoomId};
use crate::net::buffer::FrameBuffer;
use crate::net::session::{Session, SessionState};
use crate::protocol::{XtMessage, XtPacket};
use crate::AppState;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 300;

/// Outbound frames queued per session
const OUTBOUND_QUEUE_SIZE: usize = 256;

/// Connection handler for processing client connections
pub struct ConnectionHandler {
    /// Shared application state
    state: Arc<AppState>,
}

impl ConnectionHandler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Handle a TCP connection
    pub async fn handle_tcp(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        debug!(address = %addr, "Handling TCP connection");

        stream.set_nodelay(true)?;
        let (mut reader, writer) = stream.into_split();

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_SIZE);
        let session = self.state.session_manager.create_session(addr, outbound_tx)?;
        let writer_task = tokio::spawn(write_frames(writer, outbound_rx, session.id));

        let mut shutdown_rx = self.state.shutdown_tx.subscribe();
        let result = self
            .read_frames(&mut reader, &session, &mut shutdown_rx)
            .await;

        debug!(session_id = session.id, "Connection handler ending");
        self.disconnect(&session).await;
        writer_task.abort();

        match result {
            Err(WaddleError::Network(NetworkError::ConnectionClosed)) => Ok(()),
            other => other,
        }
    }

    /// Read loop: split the stream into frames and dispatch them until the
    /// client leaves or the server shuts down
    async fn read_frames<R>(
        &self,
        reader: &mut R,
        session: &Session,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut buffer = FrameBuffer::new();
        let mut chunk = [0u8; 4096];

        loop {
            let read = tokio::select! {
                read = tokio::time::timeout(
                    Duration::from_secs(READ_TIMEOUT_SECS),
                    reader.read(&mut chunk),
                ) => read.map_err(|_| NetworkError::Timeout)??,
                _ = shutdown_rx.recv() => {
                    debug!(session_id = session.id, "Server shutting down, closing connection");
                    return Ok(());
                }
            };

            if read == 0 {
                debug!(session_id = session.id, "Connection closed by client");
                return Ok(());
            }
            buffer.extend(&chunk[..read]);

            while let Some(frame) = buffer.next_frame()? {
                if let Err(e) = self.handle_frame(session, &frame).await {
                    match e {
                        WaddleError::Network(_) => return Err(e),
                        WaddleError::Persistence(_) | WaddleError::Cache(_) => {
                            warn!(session_id = session.id, error = %e, "Command failed");
                        }
                        _ => debug!(session_id = session.id, error = %e, "Command rejected"),
                    }
                }
            }
        }
    }

    /// Process one inbound frame
    pub async fn handle_frame(&self, session: &Session, frame: &str) -> Result<()> {
        session.touch();
        trace!(session_id = session.id, frame = %frame, "Received frame");

        let packet = XtPacket::parse(frame)?;
        if packet.handler == "j#js" {
            return self.handle_login(session, &packet).await;
        }

        if !session.state().can_receive_game_packets() {
            return Err(ProtocolError::NotLoggedIn.into());
        }
        let player = self
            .state
            .players
            .get_by_session(session.id)
            .ok_or(ProtocolError::NotLoggedIn)?;

        match packet.handler.as_str() {
            "j#jr" => self.handle_join_room(&player, &packet).await,
            "i#ai" => self.handle_acquire(session, &player, Category::Clothing, &packet).await,
            "i#qpa" => self.handle_acquire(session, &player, Category::Agent, &packet).await,
            "g#au" => self.handle_acquire(session, &player, Category::Igloo, &packet).await,
            "g#af" => self.handle_acquire(session, &player, Category::Furniture, &packet).await,
            "g#ag" => self.handle_acquire(session, &player, Category::Flooring, &packet).await,
            "g#aloc" => self.handle_acquire(session, &player, Category::Location, &packet).await,
            "p#papi" => self.handle_acquire(session, &player, Category::PuffleCare, &packet).await,
            handler => match handler.strip_prefix("s#").and_then(EquipmentSlot::from_opcode) {
                Some(slot) => self.handle_equip(&player, slot, &packet).await,
                None => Err(ProtocolError::UnknownHandler(handler.to_string()).into()),
            },
        }
    }

    /// `j#js`: development login by username
    async fn handle_login(&self, session: &Session, packet: &XtPacket) -> Result<()> {
        if !self.state.config.dev_mode {
            return Err(GameError::InvalidAction("login is only available in dev mode".into()).into());
        }
        if !session.is_active() {
            return Err(NetworkError::ConnectionClosed.into());
        }
        if session.player_id().is_some() {
            return Err(GameError::InvalidPlayerState("session already logged in".into()).into());
        }

        let username = packet.arg(0)?.trim();
        if username.is_empty() {
            return Err(ProtocolError::InvalidArgument {
                index: 0,
                value: String::new(),
            }
            .into());
        }

        let record = self.state.services.store.load_or_create(username).await?;
        let player = self.state.players.register(session.id, record)?;
        self.state.session_manager.bind_player(session.id, player.id)?;

        let coins = player.lock().await.account.coins;
        session.try_send(
            XtMessage::new("js")
                .arg(player.id)
                .arg(&player.username)
                .arg(coins)
                .to_frame(),
        )?;

        info!(
            session_id = session.id,
            player_id = player.id,
            username = %player.username,
            "Player logged in"
        );
        Ok(())
    }

    /// `j#jr`: join a room from the catalog
    async fn handle_join_room(&self, player: &Player, packet: &XtPacket) -> Result<()> {
        let room_id: RoomId = packet.int_arg(0)?;
        let room = self
            .state
            .catalog
            .room(room_id)
            .ok_or(GameError::RoomNotFound(room_id))?;

        self.state.actions.join_room(player, room.id, &room.name).await
    }

    /// Purchase commands: look the item up and run the acquisition engine
    async fn handle_acquire(
        &self,
        session: &Session,
        player: &Player,
        category: Category,
        packet: &XtPacket,
    ) -> Result<()> {
        let item_id: ItemId = packet.int_arg(0)?;
        let Some(item) = self.state.catalog.get(category.inventory(), item_id) else {
            debug!(player_id = player.id, item_id, category = %category, "Item not in catalog");
            return send_error(session, ClientErrorCode::ItemNotAvailable);
        };

        let quantity = match category.stack_rule(item, &self.state.config.economy) {
            StackRule::Stackable { .. } if packet.args.len() > 1 => packet.int_arg(1)?,
            _ => 1,
        };
        if quantity == 0 {
            debug!(player_id = player.id, item_id, category = %category, "Zero quantity requested");
            return send_error(session, ClientErrorCode::ItemNotAvailable);
        }

        let outcome = self
            .state
            .acquisitions
            .acquire(player, category, item, quantity, true)
            .await?;

        match outcome.error_code() {
            Some(code) => send_error(session, code),
            None => Ok(()),
        }
    }

    /// `s#upX`: equip an owned clothing item, 0 clears the slot
    async fn handle_equip(
        &self,
        player: &Player,
        slot: EquipmentSlot,
        packet: &XtPacket,
    ) -> Result<()> {
        let item_id: ItemId = packet.int_arg(0)?;
        if item_id == 0 {
            return self.state.equipment.set_slot(player, slot, None).await;
        }

        let owned = player
            .lock()
            .await
            .inventories
            .contains(InventoryKind::Clothing, item_id);
        let item = self.state.catalog.get(InventoryKind::Clothing, item_id);

        match item {
            Some(item) if owned => self.state.equipment.set_slot(player, slot, Some(item)).await,
            _ => {
                debug!(player_id = player.id, item_id, slot = %slot, "Cannot equip unowned item");
                Err(GameError::InvalidItem(item_id).into())
            }
        }
    }

    /// Release everything a session held
    async fn disconnect(&self, session: &Session) {
        if !session.is_active() {
            return;
        }
        session.set_state(SessionState::Disconnecting);

        if let Some(player) = self.state.players.get_by_session(session.id) {
            if let Err(e) = self.state.actions.leave_room(&player).await {
                warn!(player_id = player.id, error = %e, "Failed to remove player from room");
            }
            self.state.players.unregister(player.id);
        }
        self.state.session_manager.remove(session.id);
    }
}

/// Tell the client why a request was refused
fn send_error(session: &Session, code: ClientErrorCode) -> Result<()> {
    session.try_send(XtMessage::new("e").arg(code.as_u16()).to_frame())
}

/// Writer task: drain the outbound channel into the socket
async fn write_frames(
    mut writer: OwnedWriteHalf,
    mut outbound_rx: mpsc::Receiver<Vec<u8>>,
    session_id: u64,
) {
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(e) = writer.write_all(&frame).await {
            debug!(session_id, error = %e, "Write failed, closing writer");
            break;
        }
    }

    if let Err(e) = writer.shutdown().await {
        trace!(session_id, error = %e, "Error during writer shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast;

    use crate::config::ServerConfig;
    use crate::game::item::{Catalog, ItemDescriptor};
    use crate::game::room::RoomDirectory;

    fn handler() -> (ConnectionHandler, Arc<AppState>) {
        let config = ServerConfig {
            dev_mode: true,
            ..ServerConfig::default()
        };
        let mut catalog = Catalog::new();
        catalog.insert(InventoryKind::Clothing, ItemDescriptor::new(413, "Viking Helmet").cost(100));
        catalog.insert(InventoryKind::PuffleCare, ItemDescriptor::new(1, "Puffle O's").cost(10));
        catalog.insert_room(100, "Town");

        let (shutdown_tx, _) = broadcast::channel(1);
        let (state, _memory) = AppState::in_memory(config, catalog, shutdown_tx);
        let state = Arc::new(state);
        (ConnectionHandler::new(state.clone()), state)
    }

    fn frame_text(frame: Vec<u8>) -> String {
        String::from_utf8(frame[..frame.len() - 1].to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_commands_require_login() {
        let (handler, state) = handler();
        let (tx, _rx) = mpsc::channel(8);
        let session = state
            .session_manager
            .create_session("127.0.0.1:5000".parse().unwrap(), tx)
            .unwrap();

        let result = handler.handle_frame(&session, "%xt%s%i#ai%-1%413%").await;
        assert!(matches!(
            result,
            Err(WaddleError::Protocol(ProtocolError::NotLoggedIn))
        ));
    }

    #[tokio::test]
    async fn test_login_and_buy() {
        let (handler, state) = handler();
        let (tx, mut rx) = mpsc::channel(8);
        let session = state
            .session_manager
            .create_session("127.0.0.1:5000".parse().unwrap(), tx)
            .unwrap();

        handler.handle_frame(&session, "%xt%s%j#js%-1%pingu%").await.unwrap();
        let player_id = session.player_id().unwrap();
        assert_eq!(
            frame_text(rx.recv().await.unwrap()),
            format!("%xt%js%-1%{}%pingu%500%", player_id)
        );

        handler.handle_frame(&session, "%xt%s%i#ai%-1%413%").await.unwrap();
        assert_eq!(frame_text(rx.recv().await.unwrap()), "%xt%ai%-1%413%400%");

        handler.handle_frame(&session, "%xt%s%i#ai%-1%413%").await.unwrap();
        assert_eq!(frame_text(rx.recv().await.unwrap()), "%xt%e%-1%400%");

        handler.handle_frame(&session, "%xt%s%i#ai%-1%999%").await.unwrap();
        assert_eq!(frame_text(rx.recv().await.unwrap()), "%xt%e%-1%402%");
    }

    #[tokio::test]
    async fn test_equip_requires_ownership() {
        let (handler, state) = handler();
        let (tx, mut rx) = mpsc::channel(8);
        let session = state
            .session_manager
            .create_session("127.0.0.1:5000".parse().unwrap(), tx)
            .unwrap();

        handler.handle_frame(&session, "%xt%s%j#js%-1%pingu%").await.unwrap();
        handler.handle_frame(&session, "%xt%s%j#jr%-1%100%").await.unwrap();
        let _ = rx.recv().await;

        let result = handler.handle_frame(&session, "%xt%s%s#uph%-1%413%").await;
        assert!(matches!(result, Err(WaddleError::Game(GameError::InvalidItem(413)))));

        handler.handle_frame(&session, "%xt%s%i#ai%-1%413%").await.unwrap();
        let _ = rx.recv().await;
        handler.handle_frame(&session, "%xt%s%s#uph%-1%413%").await.unwrap();

        let player_id = session.player_id().unwrap();
        assert_eq!(
            frame_text(rx.recv().await.unwrap()),
            format!("%xt%uph%-1%{}%413%", player_id)
        );
    }

    #[tokio::test]
    async fn test_unknown_handler_and_room() {
        let (handler, state) = handler();
        let (tx, _rx) = mpsc::channel(8);
        let session = state
            .session_manager
            .create_session("127.0.0.1:5000".parse().unwrap(), tx)
            .unwrap();
        handler.handle_frame(&session, "%xt%s%j#js%-1%pingu%").await.unwrap();

        assert!(matches!(
            handler.handle_frame(&session, "%xt%s%x#zz%-1%").await,
            Err(WaddleError::Protocol(ProtocolError::UnknownHandler(_)))
        ));
        assert!(matches!(
            handler.handle_frame(&session, "%xt%s%j#jr%-1%404%").await,
            Err(WaddleError::Game(GameError::RoomNotFound(404)))
        ));
    }

    #[tokio::test]
    async fn test_disconnect_cleans_up() {
        let (handler, state) = handler();
        let (tx, _rx) = mpsc::channel(8);
        let session = state
            .session_manager
            .create_session("127.0.0.1:5000".parse().unwrap(), tx)
            .unwrap();
        handler.handle_frame(&session, "%xt%s%j#js%-1%pingu%").await.unwrap();
        handler.handle_frame(&session, "%xt%s%j#jr%-1%100%").await.unwrap();

        handler.disconnect(&session).await;

        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(state.players.count(), 0);
        assert_eq!(state.session_manager.count(), 0);
        assert!(state.services.rooms.occupants(100).await.is_empty());

        // a second disconnect is a no-op and the session takes no commands
        handler.disconnect(&session).await;
        assert!(matches!(
            handler.handle_frame(&session, "%xt%s%i#ai%-1%413%").await,
            Err(WaddleError::Protocol(ProtocolError::NotLoggedIn))
        ));
    }

    #[tokio::test]
    async fn test_zero_quantity_is_refused() {
        let (handler, state) = handler();
        let (tx, mut rx) = mpsc::channel(8);
        let session = state
            .session_manager
            .create_session("127.0.0.1:5000".parse().unwrap(), tx)
            .unwrap();
        handler.handle_frame(&session, "%xt%s%j#js%-1%pingu%").await.unwrap();
        let _ = rx.recv().await;

        handler.handle_frame(&session, "%xt%s%p#papi%-1%1%0%").await.unwrap();
        assert_eq!(frame_text(rx.recv().await.unwrap()), "%xt%e%-1%402%");

        let player = state.players.get_by_session(session.id).unwrap();
        let snapshot = player.snapshot().await;
        assert!(!snapshot.inventories.contains(InventoryKind::PuffleCare, 1));
        assert_eq!(snapshot.account.coins, 500);
    }

    #[tokio::test]
    async fn test_shutdown_ends_read_loop() {
        let (handler, state) = handler();
        let (tx, _rx) = mpsc::channel(8);
        let session = state
            .session_manager
            .create_session("127.0.0.1:5000".parse().unwrap(), tx)
            .unwrap();
        let (_client, mut server) = tokio::io::duplex(64);

        let mut shutdown_rx = state.shutdown_tx.subscribe();
        state.shutdown_tx.send(()).unwrap();

        let result = handler
            .read_frames(&mut server, &session, &mut shutdown_rx)
            .await;
        assert!(result.is_ok());
    }
}
