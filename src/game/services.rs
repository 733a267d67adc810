//! Collaborator bundle handed to the game engines

use std::sync::Arc;

use crate::cache::{DerivedCache, MemoryCache};
use crate::game::audit::{AuditLog, MemoryAuditLog};
use crate::game::persistence::{MemoryStore, PlayerStore};
use crate::game::room::{RoomDirectory, RoomRegistry};
use crate::net::notifier::Notifier;

/// Shared handles to every collaborator the engines write through
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn PlayerStore>,
    pub cache: Arc<dyn DerivedCache>,
    pub notifier: Arc<dyn Notifier>,
    pub rooms: Arc<dyn RoomDirectory>,
    pub audit: Arc<dyn AuditLog>,
}

impl Services {
    pub fn new(
        store: Arc<dyn PlayerStore>,
        cache: Arc<dyn DerivedCache>,
        notifier: Arc<dyn Notifier>,
        rooms: Arc<dyn RoomDirectory>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            store,
            cache,
            notifier,
            rooms,
            audit,
        }
    }
}

/// In-memory collaborators with concrete handles kept for inspection
#[derive(Clone)]
pub struct MemoryServices {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub rooms: Arc<RoomRegistry>,
    pub audit: Arc<MemoryAuditLog>,
}

impl MemoryServices {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            cache: Arc::new(MemoryCache::new()),
            rooms: Arc::new(RoomRegistry::new()),
            audit: Arc::new(MemoryAuditLog::new()),
        }
    }

    /// Bundle these with a notifier
    pub fn services(&self, notifier: Arc<dyn Notifier>) -> Services {
        Services::new(
            self.store.clone(),
            self.cache.clone(),
            notifier,
            self.rooms.clone(),
            self.audit.clone(),
        )
    }
}

impl Default for MemoryServices {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
