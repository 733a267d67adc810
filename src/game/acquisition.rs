//! Acquisition engine
//!
//! Adds catalog items to a player's inventories. One engine handles every
//! category; the [`Category`] decides where the item lands, how it stacks and
//! which balance pays for it.
//!
//! On success the inventory change and the balance deduction are committed in
//! a single store call, then the in-memory state is updated, the owner is
//! notified, an audit line is written and stale cache keys are dropped.
//! Rejections (already owned, over the cap, ineligible, cannot pay) are
//! outcomes, not errors, and change nothing.

use tracing::{debug, warn};

use crate::config::EconomyConfig;
use crate::error::{ClientErrorCode, GameError, Result};
use crate::game::category::{Category, StackRule};
use crate::game::inventory::EntryPlan;
use crate::game::item::ItemDescriptor;
use crate::game::persistence::{AcquisitionChange, BalanceWrite, EntryWrite};
use crate::game::player::Player;
use crate::game::services::Services;

/// Outcome of an acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    Added,
    AlreadyOwned,
    CapReached,
    /// Agent item without the agent flag
    Ineligible,
    InsufficientFunds,
}

impl Acquisition {
    pub fn is_added(&self) -> bool {
        matches!(self, Acquisition::Added)
    }

    /// Code sent to the client when the attempt was rejected
    pub fn error_code(&self) -> Option<ClientErrorCode> {
        match self {
            Acquisition::Added => None,
            Acquisition::AlreadyOwned => Some(ClientErrorCode::AlreadyOwned),
            Acquisition::CapReached => Some(ClientErrorCode::CapReached),
            Acquisition::Ineligible => Some(ClientErrorCode::ItemNotAvailable),
            Acquisition::InsufficientFunds => Some(ClientErrorCode::InsufficientFunds),
        }
    }
}

/// Adds items to player inventories
pub struct AcquisitionEngine {
    services: Services,
    economy: EconomyConfig,
}

impl AcquisitionEngine {
    pub fn new(services: Services, economy: EconomyConfig) -> Self {
        Self { services, economy }
    }

    /// Acquire `quantity` of `item` in `category` for `player`.
    ///
    /// `quantity` only matters for stacking categories; unique ones always
    /// store 1. With `notify` unset the owner is not sent the "added" message.
    pub async fn acquire(
        &self,
        player: &Player,
        category: Category,
        item: &ItemDescriptor,
        quantity: u32,
        notify: bool,
    ) -> Result<Acquisition> {
        if quantity == 0 {
            return Err(GameError::InvalidAction(format!(
                "cannot acquire zero of item {}",
                item.id
            ))
            .into());
        }

        let mut state = player.lock().await;

        if category.requires_epf() && !item.epf {
            debug!(player_id = player.id, item_id = item.id, "Item is not an agent item");
            return Ok(Acquisition::Ineligible);
        }

        let kind = category.inventory();
        let inventory = state.inventories.get(kind);
        let plan = match category.stack_rule(item, &self.economy) {
            StackRule::Unique => inventory.plan_unique(item.id),
            StackRule::Stackable { cap } => inventory.plan_stack(item.id, quantity, cap),
        };

        let entry = match plan {
            EntryPlan::Insert { quantity } => EntryWrite::Insert { quantity },
            EntryPlan::Update { quantity } => EntryWrite::Update { quantity },
            EntryPlan::AlreadyOwned => {
                debug!(player_id = player.id, item_id = item.id, category = %category, "Already owned");
                return Ok(Acquisition::AlreadyOwned);
            }
            EntryPlan::CapReached => {
                debug!(player_id = player.id, item_id = item.id, category = %category, "Stack cap reached");
                return Ok(Acquisition::CapReached);
            }
        };

        let debit = match category.charged_currency() {
            Some(currency) if item.cost > 0 => {
                if self.economy.enforce_balance && !state.account.can_afford(currency, item.cost) {
                    debug!(
                        player_id = player.id,
                        item_id = item.id,
                        cost = item.cost,
                        balance = state.account.balance(currency),
                        "Insufficient funds"
                    );
                    return Ok(Acquisition::InsufficientFunds);
                }
                Some(BalanceWrite {
                    currency,
                    amount: item.cost,
                    balance: state.account.balance_after(currency, item.cost),
                })
            }
            _ => None,
        };

        let change = AcquisitionChange {
            player_id: player.id,
            inventory: kind,
            item_id: item.id,
            entry,
            debit,
        };
        self.services.store.commit_acquisition(&change).await?;

        state.inventories.get_mut(kind).apply(item.id, plan);
        if let Some(debit) = debit {
            state.account.set_balance(debit.currency, debit.balance);
        }

        if notify {
            if let Some(message) = category.notification(item, quantity, &state.account) {
                if let Err(e) = self
                    .services
                    .notifier
                    .send_to_player(player.id, &message)
                    .await
                {
                    warn!(
                        player_id = player.id,
                        opcode = message.opcode(),
                        error = %e,
                        "Failed to notify player of acquisition"
                    );
                }
            }
        }

        self.services
            .audit
            .record(&category.audit_message(&player.username, &item.name));

        for key in category.cache_keys(player.id) {
            if let Err(e) = self.services.cache.delete(&key).await {
                warn!(key = %key, error = %e, "Failed to invalidate cache key");
            }
        }

        debug!(
            player_id = player.id,
            item_id = item.id,
            category = %category,
            quantity = entry.quantity(),
            "Item acquired"
        );

        Ok(Acquisition::Added)
    }
}
