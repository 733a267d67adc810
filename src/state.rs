//! Application state module
//!
//! Contains the shared state used across all server connections.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::cache::DerivedCache;
use crate::config::ServerConfig;
use crate::game::audit::AuditLog;
use crate::game::item::Catalog;
use crate::game::persistence::PlayerStore;
use crate::game::room::RoomDirectory;
use crate::game::services::{MemoryServices, Services};
use crate::game::{AcquisitionEngine, EquipmentManager, PlayerActions, PlayerManager};
use crate::net::notifier::SessionNotifier;
use crate::net::session::SessionManager;

/// Storage-side collaborators chosen at start-up
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn PlayerStore>,
    pub cache: Arc<dyn DerivedCache>,
    pub rooms: Arc<dyn RoomDirectory>,
    pub audit: Arc<dyn AuditLog>,
}

impl From<&MemoryServices> for Backends {
    fn from(memory: &MemoryServices) -> Self {
        Self {
            store: memory.store.clone(),
            cache: memory.cache.clone(),
            rooms: memory.rooms.clone(),
            audit: memory.audit.clone(),
        }
    }
}

/// Application state shared across all connections
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Session manager for tracking connected clients
    pub session_manager: Arc<SessionManager>,
    /// Logged-in players
    pub players: PlayerManager,
    /// Item catalog
    pub catalog: Catalog,
    /// Collaborators shared by the engines
    pub services: Services,
    pub acquisitions: AcquisitionEngine,
    pub equipment: EquipmentManager,
    pub actions: PlayerActions,
    /// Shutdown signal sender
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Create the application state over the given backends
    pub fn new(
        config: ServerConfig,
        catalog: Catalog,
        backends: Backends,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        let session_manager = Arc::new(SessionManager::new());
        let notifier = Arc::new(SessionNotifier::new(
            session_manager.clone(),
            backends.rooms.clone(),
        ));
        let services = Services::new(
            backends.store,
            backends.cache,
            notifier,
            backends.rooms,
            backends.audit,
        );

        if !config.economy.enforce_balance {
            info!("Balance checks disabled, balances may go negative");
        }

        Self {
            players: PlayerManager::new(config.max_players as usize),
            acquisitions: AcquisitionEngine::new(services.clone(), config.economy.clone()),
            equipment: EquipmentManager::new(services.clone()),
            actions: PlayerActions::new(services.clone()),
            services,
            session_manager,
            catalog,
            config,
            shutdown_tx,
        }
    }

    /// Create the application state over in-memory backends
    pub fn in_memory(
        config: ServerConfig,
        catalog: Catalog,
        shutdown_tx: broadcast::Sender<()>,
    ) -> (Self, MemoryServices) {
        let memory = MemoryServices::new();
        let state = Self::new(config, catalog, Backends::from(&memory), shutdown_tx);
        (state, memory)
    }
}
