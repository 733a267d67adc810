//! Player persistence module
//!
//! The store contract the game core writes through. Implementations:
//! - `MemoryStore` for development mode and tests
//! - `PgPlayerStore` for PostgreSQL
//!
//! Each inventory change and the balance it costs are committed together in
//! one call, so a failure never leaves one without the other.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::game::currency::{Currency, CurrencyAccount};
use crate::game::equipment::{Equipment, EquipmentSlot};
use crate::game::inventory::{Inventories, InventoryKind};
use crate::game::{ItemId, MailId, PlayerId};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgPlayerStore;

/// Coins a brand new player starts with
pub const STARTING_COINS: i32 = 500;

/// Everything loaded for a player at login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub username: String,
    pub account: CurrencyAccount,
    pub inventories: Inventories,
    pub equipment: Equipment,
    pub permissions: HashSet<String>,
}

impl PlayerRecord {
    /// A fresh player with starting coins and nothing else
    pub fn new(id: PlayerId, username: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            account: CurrencyAccount::new(STARTING_COINS, 0),
            inventories: Inventories::new(),
            equipment: Equipment::new(),
            permissions: HashSet::new(),
        }
    }
}

/// How an inventory row changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryWrite {
    /// New row
    Insert { quantity: u32 },
    /// Existing row gets a new quantity
    Update { quantity: u32 },
}

impl EntryWrite {
    pub fn quantity(&self) -> u32 {
        match self {
            EntryWrite::Insert { quantity } | EntryWrite::Update { quantity } => *quantity,
        }
    }
}

/// A deduction from one balance
///
/// Stores subtract `amount` from the persisted balance. `balance` is the
/// value the in-memory account takes once the commit succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceWrite {
    pub currency: Currency,
    pub amount: u32,
    pub balance: i32,
}

/// One acquisition's writes, committed atomically
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionChange {
    pub player_id: PlayerId,
    pub inventory: InventoryKind,
    pub item_id: ItemId,
    pub entry: EntryWrite,
    pub debit: Option<BalanceWrite>,
}

/// A mail record to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMail {
    pub recipient_id: PlayerId,
    pub sender_id: Option<PlayerId>,
    pub postcard_id: ItemId,
    pub details: String,
    pub sent_at: DateTime<Utc>,
}

/// Persistence collaborator for player state
#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Load a player by username, creating a fresh record if none exists
    async fn load_or_create(&self, username: &str) -> Result<PlayerRecord>;

    /// Write an inventory change and its balance deduction as one unit
    async fn commit_acquisition(&self, change: &AcquisitionChange) -> Result<()>;

    /// Write a slot value (`None` clears it)
    async fn set_slot(
        &self,
        player_id: PlayerId,
        slot: EquipmentSlot,
        item_id: Option<ItemId>,
    ) -> Result<()>;

    /// Add a permission row
    async fn insert_permission(&self, player_id: PlayerId, permission: &str) -> Result<()>;

    /// Create a mail record, returning its ID
    async fn insert_mail(&self, mail: &NewMail) -> Result<MailId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record() {
        let record = PlayerRecord::new(1, "pingu");
        assert_eq!(record.account.coins, STARTING_COINS);
        assert_eq!(record.account.agent_medals, 0);
        assert!(record.permissions.is_empty());
        assert!(record.equipment.is_empty(EquipmentSlot::Color));
    }

    #[test]
    fn test_entry_write_quantity() {
        assert_eq!(EntryWrite::Insert { quantity: 3 }.quantity(), 3);
        assert_eq!(EntryWrite::Update { quantity: 9 }.quantity(), 9);
    }
}
