//! Inventory module
//!
//! This module handles the player's typed inventories:
//! - One inventory per kind (clothing, igloos, furniture, ...)
//! - Unique entries (owned or not) and stackable entries with a cap
//! - Planning an addition without mutating, so callers can persist first

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::game::ItemId;

/// The independent inventories a player owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryKind {
    Clothing,
    Igloo,
    PuffleCare,
    Furniture,
    Card,
    Flooring,
    Location,
    Stamp,
}

impl InventoryKind {
    /// All inventory kinds
    pub fn all() -> &'static [InventoryKind] {
        &[
            InventoryKind::Clothing,
            InventoryKind::Igloo,
            InventoryKind::PuffleCare,
            InventoryKind::Furniture,
            InventoryKind::Card,
            InventoryKind::Flooring,
            InventoryKind::Location,
            InventoryKind::Stamp,
        ]
    }

    /// Database table storing this inventory
    pub fn table(&self) -> &'static str {
        match self {
            InventoryKind::Clothing => "penguin_item",
            InventoryKind::Igloo => "penguin_igloo",
            InventoryKind::PuffleCare => "penguin_puffle_item",
            InventoryKind::Furniture => "penguin_furniture",
            InventoryKind::Card => "penguin_card",
            InventoryKind::Flooring => "penguin_flooring",
            InventoryKind::Location => "penguin_location",
            InventoryKind::Stamp => "penguin_stamp",
        }
    }

    /// Column holding the item ID in `table()`
    pub fn item_column(&self) -> &'static str {
        match self {
            InventoryKind::Clothing | InventoryKind::PuffleCare => "item_id",
            InventoryKind::Igloo => "igloo_id",
            InventoryKind::Furniture => "furniture_id",
            InventoryKind::Card => "card_id",
            InventoryKind::Flooring => "flooring_id",
            InventoryKind::Location => "location_id",
            InventoryKind::Stamp => "stamp_id",
        }
    }

    /// Whether `table()` has a quantity column
    pub fn has_quantity(&self) -> bool {
        matches!(
            self,
            InventoryKind::PuffleCare | InventoryKind::Furniture | InventoryKind::Card
        )
    }
}

impl std::fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InventoryKind::Clothing => "clothing",
            InventoryKind::Igloo => "igloos",
            InventoryKind::PuffleCare => "puffle care",
            InventoryKind::Furniture => "furniture",
            InventoryKind::Card => "ninja deck",
            InventoryKind::Flooring => "flooring",
            InventoryKind::Location => "location",
            InventoryKind::Stamp => "stamps",
        };
        write!(f, "{}", name)
    }
}

/// What adding an item to an inventory would do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPlan {
    /// Create a new entry with this quantity
    Insert { quantity: u32 },
    /// Raise an existing entry to this quantity
    Update { quantity: u32 },
    /// Unique entry already present
    AlreadyOwned,
    /// The stack would go over its cap
    CapReached,
}

/// One of the player's inventories (item ID -> quantity)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    entries: HashMap<ItemId, u32>,
}

impl Inventory {
    /// Create a new empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an inventory from persisted `(item, quantity)` rows
    pub fn from_entries(entries: impl IntoIterator<Item = (ItemId, u32)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .filter(|(_, quantity)| *quantity > 0)
                .collect(),
        }
    }

    /// Check if the inventory holds an item
    pub fn contains(&self, item_id: ItemId) -> bool {
        self.entries.contains_key(&item_id)
    }

    /// Quantity held of an item (0 if absent)
    pub fn quantity(&self, item_id: ItemId) -> u32 {
        self.entries.get(&item_id).copied().unwrap_or(0)
    }

    /// Number of distinct items
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the inventory is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plan adding a unique item
    pub fn plan_unique(&self, item_id: ItemId) -> EntryPlan {
        if self.contains(item_id) {
            EntryPlan::AlreadyOwned
        } else {
            EntryPlan::Insert { quantity: 1 }
        }
    }

    /// Plan adding `quantity` of a stackable item capped at `cap`
    pub fn plan_stack(&self, item_id: ItemId, quantity: u32, cap: u32) -> EntryPlan {
        let current = self.entries.get(&item_id).copied();
        let target = current.unwrap_or(0).checked_add(quantity);

        match (current, target) {
            (_, Some(target)) if target > cap => EntryPlan::CapReached,
            (_, None) => EntryPlan::CapReached,
            (Some(_), Some(target)) => EntryPlan::Update { quantity: target },
            (None, Some(target)) => EntryPlan::Insert { quantity: target },
        }
    }

    /// Apply a planned insert or update
    pub fn apply(&mut self, item_id: ItemId, plan: EntryPlan) {
        match plan {
            EntryPlan::Insert { quantity } | EntryPlan::Update { quantity } => {
                self.entries.insert(item_id, quantity);
            }
            EntryPlan::AlreadyOwned | EntryPlan::CapReached => {}
        }
    }

    /// Iterate over `(item, quantity)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.entries.iter().map(|(id, quantity)| (*id, *quantity))
    }
}

/// All of a player's inventories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventories {
    inventories: HashMap<InventoryKind, Inventory>,
}

impl Inventories {
    /// Create empty inventories
    pub fn new() -> Self {
        Self::default()
    }

    /// Get one inventory (empty if never written)
    pub fn get(&self, kind: InventoryKind) -> &Inventory {
        static EMPTY: std::sync::OnceLock<Inventory> = std::sync::OnceLock::new();
        self.inventories
            .get(&kind)
            .unwrap_or_else(|| EMPTY.get_or_init(Inventory::new))
    }

    /// Get one inventory mutably
    pub fn get_mut(&mut self, kind: InventoryKind) -> &mut Inventory {
        self.inventories.entry(kind).or_default()
    }

    /// Replace one inventory wholesale (used when loading)
    pub fn set(&mut self, kind: InventoryKind, inventory: Inventory) {
        self.inventories.insert(kind, inventory);
    }

    /// Check if an inventory holds an item
    pub fn contains(&self, kind: InventoryKind, item_id: ItemId) -> bool {
        self.get(kind).contains(item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_unique() {
        let mut inventory = Inventory::new();
        assert_eq!(inventory.plan_unique(1), EntryPlan::Insert { quantity: 1 });

        inventory.apply(1, EntryPlan::Insert { quantity: 1 });
        assert_eq!(inventory.plan_unique(1), EntryPlan::AlreadyOwned);
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn test_plan_stack_increments() {
        let inventory = Inventory::from_entries([(305, 3)]);
        assert_eq!(
            inventory.plan_stack(305, 1, 5),
            EntryPlan::Update { quantity: 4 }
        );
        assert_eq!(
            inventory.plan_stack(305, 2, 5),
            EntryPlan::Update { quantity: 5 }
        );
        assert_eq!(inventory.plan_stack(305, 3, 5), EntryPlan::CapReached);
    }

    #[test]
    fn test_plan_stack_new_entry() {
        let inventory = Inventory::new();
        assert_eq!(
            inventory.plan_stack(7, 10, 100),
            EntryPlan::Insert { quantity: 10 }
        );
        assert_eq!(inventory.plan_stack(7, 101, 100), EntryPlan::CapReached);
    }

    #[test]
    fn test_plan_stack_overflow() {
        let inventory = Inventory::from_entries([(7, u32::MAX)]);
        assert_eq!(inventory.plan_stack(7, 1, u32::MAX), EntryPlan::CapReached);
    }

    #[test]
    fn test_apply_ignores_rejections() {
        let mut inventory = Inventory::from_entries([(1, 2)]);
        inventory.apply(1, EntryPlan::CapReached);
        inventory.apply(2, EntryPlan::AlreadyOwned);

        assert_eq!(inventory.quantity(1), 2);
        assert!(!inventory.contains(2));
    }

    #[test]
    fn test_from_entries_drops_empty_rows() {
        let inventory = Inventory::from_entries([(1, 0), (2, 1)]);
        assert!(!inventory.contains(1));
        assert!(inventory.contains(2));
    }

    #[test]
    fn test_inventories_are_independent() {
        let mut inventories = Inventories::new();
        inventories
            .get_mut(InventoryKind::Igloo)
            .apply(3, EntryPlan::Insert { quantity: 1 });

        assert!(inventories.contains(InventoryKind::Igloo, 3));
        assert!(!inventories.contains(InventoryKind::Flooring, 3));
        assert!(inventories.get(InventoryKind::Stamp).is_empty());
    }

    #[test]
    fn test_inventory_kind_tables() {
        assert_eq!(InventoryKind::Furniture.table(), "penguin_furniture");
        assert_eq!(InventoryKind::Furniture.item_column(), "furniture_id");
        assert!(InventoryKind::PuffleCare.has_quantity());
        assert!(!InventoryKind::Stamp.has_quantity());
        assert_eq!(InventoryKind::all().len(), 8);
    }
}
