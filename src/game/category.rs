//! Acquisition categories
//!
//! Each category describes how an acquisition behaves: which inventory it
//! lands in, whether entries are unique or stack up to a cap, which balance
//! pays for it, which message tells the client, and which derived cache
//! aggregates go stale.

use serde::{Deserialize, Serialize};

use crate::config::EconomyConfig;
use crate::game::currency::{Currency, CurrencyAccount};
use crate::game::inventory::InventoryKind;
use crate::game::item::ItemDescriptor;
use crate::game::PlayerId;
use crate::protocol::XtMessage;

/// How entries of a category accumulate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackRule {
    /// Owned or not; quantity is always 1
    Unique,
    /// Quantity grows up to `cap`
    Stackable { cap: u32 },
}

/// Something a player can acquire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Clothing,
    /// Clothing bought with agent medals
    Agent,
    Igloo,
    PuffleCare,
    Furniture,
    Card,
    Flooring,
    Location,
    Stamp,
}

impl Category {
    /// Inventory the acquired item is stored in
    pub fn inventory(&self) -> InventoryKind {
        match self {
            Category::Clothing | Category::Agent => InventoryKind::Clothing,
            Category::Igloo => InventoryKind::Igloo,
            Category::PuffleCare => InventoryKind::PuffleCare,
            Category::Furniture => InventoryKind::Furniture,
            Category::Card => InventoryKind::Card,
            Category::Flooring => InventoryKind::Flooring,
            Category::Location => InventoryKind::Location,
            Category::Stamp => InventoryKind::Stamp,
        }
    }

    /// Entry rule for `item`
    pub fn stack_rule(&self, item: &ItemDescriptor, economy: &EconomyConfig) -> StackRule {
        match self {
            Category::PuffleCare => StackRule::Stackable {
                cap: economy.puffle_care_cap,
            },
            Category::Furniture => StackRule::Stackable {
                cap: item.max_quantity.unwrap_or(economy.furniture_cap),
            },
            _ => StackRule::Unique,
        }
    }

    /// Balance charged for an acquisition (cards and stamps are free)
    pub fn charged_currency(&self) -> Option<Currency> {
        match self {
            Category::Agent => Some(Currency::AgentMedals),
            Category::Card | Category::Stamp => None,
            _ => Some(Currency::Coins),
        }
    }

    /// Whether the item must carry the agent flag
    pub fn requires_epf(&self) -> bool {
        matches!(self, Category::Agent)
    }

    /// Opcode of the "item added" message, if the category has one
    pub fn opcode(&self) -> Option<&'static str> {
        match self {
            Category::Clothing => Some("ai"),
            Category::Agent => Some("epfai"),
            Category::Igloo => Some("au"),
            Category::PuffleCare => Some("papi"),
            Category::Furniture => Some("af"),
            Category::Flooring => Some("ag"),
            Category::Location => Some("aloc"),
            Category::Stamp => Some("aabs"),
            Category::Card => None,
        }
    }

    /// Build the "item added" message with the post-acquisition balances
    pub fn notification(
        &self,
        item: &ItemDescriptor,
        quantity: u32,
        account: &CurrencyAccount,
    ) -> Option<XtMessage> {
        let opcode = self.opcode()?;
        let message = XtMessage::new(opcode);
        let message = match self {
            Category::Agent => message.arg(account.agent_medals),
            Category::PuffleCare => message.arg(account.coins).arg(item.id).arg(quantity),
            Category::Stamp => message.arg(item.id),
            _ => message.arg(item.id).arg(account.coins),
        };
        Some(message)
    }

    /// Derived cache aggregates invalidated by an acquisition
    ///
    /// Pins and awards are built from the clothing inventory, which agent
    /// items also land in.
    pub fn cache_aggregates(&self) -> &'static [&'static str] {
        match self {
            Category::Clothing | Category::Agent => &["pins", "awards"],
            Category::Stamp => &["stamps"],
            _ => &[],
        }
    }

    /// Cache keys for `player_id`
    pub fn cache_keys(&self, player_id: PlayerId) -> Vec<String> {
        self.cache_aggregates()
            .iter()
            .map(|aggregate| crate::cache::cache_key(aggregate, player_id))
            .collect()
    }

    /// Audit line for a successful acquisition
    pub fn audit_message(&self, username: &str, item_name: &str) -> String {
        match self {
            Category::Stamp => format!("{} earned stamp '{}'", username, item_name),
            Category::Card => format!("{} added '{}' to their ninja deck", username, item_name),
            Category::Agent => format!(
                "{} added '{}' to their clothing inventory with agent medals",
                username, item_name
            ),
            _ => format!(
                "{} added '{}' to their {} inventory",
                username,
                item_name,
                self.inventory()
            ),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Agent => write!(f, "agent"),
            other => write!(f, "{}", other.inventory()),
        }
    }
}
