//! In-memory player store
//!
//! Backs development mode and the test suites. Writes can be made to fail
//! on demand to exercise error paths.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::{AcquisitionChange, NewMail, PlayerRecord, PlayerStore};
use crate::error::{PersistenceError, Result, WaddleError};
use crate::game::equipment::EquipmentSlot;
use crate::game::inventory::EntryPlan;
use crate::game::persistence::EntryWrite;
use crate::game::{ItemId, MailId, PlayerId};

/// Player store kept entirely in process memory
#[derive(Debug)]
pub struct MemoryStore {
    records: DashMap<PlayerId, PlayerRecord>,
    username_to_id: DashMap<String, PlayerId>,
    mail: Mutex<Vec<(MailId, NewMail)>>,
    next_player_id: AtomicU32,
    next_mail_id: AtomicU32,
    fail_writes: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            username_to_id: DashMap::new(),
            mail: Mutex::new(Vec::new()),
            next_player_id: AtomicU32::new(101),
            next_mail_id: AtomicU32::new(1),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Seed a record (replacing any with the same ID)
    pub fn insert_record(&self, record: PlayerRecord) {
        self.next_player_id
            .fetch_max(record.id.saturating_add(1), Ordering::SeqCst);
        self.username_to_id
            .insert(record.username.to_lowercase(), record.id);
        self.records.insert(record.id, record);
    }

    /// Current persisted copy of a player
    pub fn record(&self, player_id: PlayerId) -> Option<PlayerRecord> {
        self.records.get(&player_id).map(|r| r.clone())
    }

    /// Persisted mail for a recipient
    pub fn mail_for(&self, recipient_id: PlayerId) -> Vec<(MailId, NewMail)> {
        self.mail
            .lock()
            .iter()
            .filter(|(_, mail)| mail.recipient_id == recipient_id)
            .cloned()
            .collect()
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Rejected("store is read-only".to_string()).into());
        }
        Ok(())
    }

    fn not_found(player_id: PlayerId) -> WaddleError {
        PersistenceError::NotFound(format!("player {}", player_id)).into()
    }
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn load_or_create(&self, username: &str) -> Result<PlayerRecord> {
        let key = username.to_lowercase();
        if let Some(id) = self.username_to_id.get(&key).map(|id| *id) {
            if let Some(record) = self.record(id) {
                return Ok(record);
            }
        }

        self.check_writable()?;
        let id = self.next_player_id.fetch_add(1, Ordering::SeqCst);
        let record = PlayerRecord::new(id, username);
        self.insert_record(record.clone());

        debug!(player_id = id, username = %username, "Created player record");

        Ok(record)
    }

    async fn commit_acquisition(&self, change: &AcquisitionChange) -> Result<()> {
        self.check_writable()?;
        let mut record = self
            .records
            .get_mut(&change.player_id)
            .ok_or_else(|| Self::not_found(change.player_id))?;

        let inventory = record.inventories.get_mut(change.inventory);
        let plan = match change.entry {
            EntryWrite::Insert { quantity } => {
                if inventory.contains(change.item_id) {
                    return Err(PersistenceError::Rejected(format!(
                        "duplicate {} entry {}",
                        change.inventory, change.item_id
                    ))
                    .into());
                }
                EntryPlan::Insert { quantity }
            }
            EntryWrite::Update { quantity } => EntryPlan::Update { quantity },
        };
        inventory.apply(change.item_id, plan);

        if let Some(debit) = change.debit {
            let balance = record.account.balance_after(debit.currency, debit.amount);
            record.account.set_balance(debit.currency, balance);
        }

        Ok(())
    }

    async fn set_slot(
        &self,
        player_id: PlayerId,
        slot: EquipmentSlot,
        item_id: Option<ItemId>,
    ) -> Result<()> {
        self.check_writable()?;
        let mut record = self
            .records
            .get_mut(&player_id)
            .ok_or_else(|| Self::not_found(player_id))?;
        record.equipment.set(slot, item_id);
        Ok(())
    }

    async fn insert_permission(&self, player_id: PlayerId, permission: &str) -> Result<()> {
        self.check_writable()?;
        let mut record = self
            .records
            .get_mut(&player_id)
            .ok_or_else(|| Self::not_found(player_id))?;
        record.permissions.insert(permission.to_string());
        Ok(())
    }

    async fn insert_mail(&self, mail: &NewMail) -> Result<MailId> {
        self.check_writable()?;
        let id = self.next_mail_id.fetch_add(1, Ordering::SeqCst);
        self.mail.lock().push((id, mail.clone()));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::currency::Currency;
    use crate::game::inventory::InventoryKind;
    use crate::game::persistence::BalanceWrite;

    #[tokio::test]
    async fn test_load_or_create_is_stable() {
        let store = MemoryStore::new();
        let first = store.load_or_create("Pingu").await.unwrap();
        let second = store.load_or_create("pingu").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.username, "Pingu");
    }

    #[tokio::test]
    async fn test_commit_acquisition() {
        let store = MemoryStore::new();
        let record = store.load_or_create("pingu").await.unwrap();

        store
            .commit_acquisition(&AcquisitionChange {
                player_id: record.id,
                inventory: InventoryKind::Furniture,
                item_id: 305,
                entry: EntryWrite::Insert { quantity: 2 },
                debit: Some(BalanceWrite {
                    currency: Currency::Coins,
                    amount: 100,
                    balance: 400,
                }),
            })
            .await
            .unwrap();

        let record = store.record(record.id).unwrap();
        assert_eq!(
            record.inventories.get(InventoryKind::Furniture).quantity(305),
            2
        );
        assert_eq!(record.account.coins, 400);
    }

    #[tokio::test]
    async fn test_debit_applies_to_stored_balance() {
        let store = MemoryStore::new();
        let mut record = PlayerRecord::new(101, "pingu");
        record.account.coins = 250;
        store.insert_record(record);

        // a stale in-memory balance does not overwrite the stored one
        store
            .commit_acquisition(&AcquisitionChange {
                player_id: 101,
                inventory: InventoryKind::Clothing,
                item_id: 413,
                entry: EntryWrite::Insert { quantity: 1 },
                debit: Some(BalanceWrite {
                    currency: Currency::Coins,
                    amount: 100,
                    balance: 400,
                }),
            })
            .await
            .unwrap();

        assert_eq!(store.record(101).unwrap().account.coins, 150);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        let record = store.load_or_create("pingu").await.unwrap();
        let change = AcquisitionChange {
            player_id: record.id,
            inventory: InventoryKind::Clothing,
            item_id: 1,
            entry: EntryWrite::Insert { quantity: 1 },
            debit: None,
        };

        store.commit_acquisition(&change).await.unwrap();
        assert!(store.commit_acquisition(&change).await.is_err());
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let store = MemoryStore::new();
        let record = store.load_or_create("pingu").await.unwrap();

        store.set_fail_writes(true);
        let result = store
            .set_slot(record.id, EquipmentSlot::Head, Some(413))
            .await;
        assert!(matches!(
            result,
            Err(WaddleError::Persistence(PersistenceError::Rejected(_)))
        ));

        store.set_fail_writes(false);
        store
            .set_slot(record.id, EquipmentSlot::Head, Some(413))
            .await
            .unwrap();
        assert_eq!(
            store.record(record.id).unwrap().equipment.get(EquipmentSlot::Head),
            Some(413)
        );
    }

    #[tokio::test]
    async fn test_unknown_player() {
        let store = MemoryStore::new();
        assert!(store.insert_permission(9999, "admin").await.is_err());
    }
}
