//! Item definitions module
//!
//! Item descriptors as the acquisition engine sees them (id, display name,
//! cost, optional quantity cap, agent flag) and the catalog they are loaded
//! from at start-up.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WaddleError};
use crate::game::inventory::InventoryKind;
use crate::game::{ItemId, RoomId};

/// Everything the core needs to know about an ownable item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    /// Item ID
    pub id: ItemId,
    /// Display name used in audit lines
    pub name: String,
    /// Price in the category's currency
    #[serde(default)]
    pub cost: u32,
    /// Per-item stack cap (furniture)
    #[serde(default)]
    pub max_quantity: Option<u32>,
    /// Whether the item may be bought with agent medals
    #[serde(default)]
    pub epf: bool,
}

impl ItemDescriptor {
    /// Create a new descriptor with no cost
    pub fn new(id: ItemId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            cost: 0,
            max_quantity: None,
            epf: false,
        }
    }

    /// Builder method - set cost
    pub fn cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Builder method - set stack cap
    pub fn max_quantity(mut self, max_quantity: u32) -> Self {
        self.max_quantity = Some(max_quantity);
        self
    }

    /// Builder method - set agent flag
    pub fn epf(mut self, epf: bool) -> Self {
        self.epf = epf;
        self
    }
}

/// On-disk catalog layout
#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<ItemDescriptor>,
    #[serde(default)]
    igloos: Vec<ItemDescriptor>,
    #[serde(default)]
    puffle_items: Vec<ItemDescriptor>,
    #[serde(default)]
    furniture: Vec<ItemDescriptor>,
    #[serde(default)]
    cards: Vec<ItemDescriptor>,
    #[serde(default)]
    flooring: Vec<ItemDescriptor>,
    #[serde(default)]
    locations: Vec<ItemDescriptor>,
    #[serde(default)]
    stamps: Vec<ItemDescriptor>,
    #[serde(default)]
    postcards: Vec<ItemDescriptor>,
    #[serde(default)]
    rooms: Vec<RoomDescriptor>,
}

/// A joinable room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDescriptor {
    pub id: RoomId,
    pub name: String,
}

/// Item descriptors indexed by inventory and ID
#[derive(Debug, Default)]
pub struct Catalog {
    entries: HashMap<InventoryKind, HashMap<ItemId, ItemDescriptor>>,
    postcards: HashMap<ItemId, ItemDescriptor>,
    rooms: HashMap<RoomId, RoomDescriptor>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from its JSON representation
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| WaddleError::Config(format!("Invalid catalog: {}", e)))?;

        let mut catalog = Self::new();
        let sections = [
            (InventoryKind::Clothing, file.items),
            (InventoryKind::Igloo, file.igloos),
            (InventoryKind::PuffleCare, file.puffle_items),
            (InventoryKind::Furniture, file.furniture),
            (InventoryKind::Card, file.cards),
            (InventoryKind::Flooring, file.flooring),
            (InventoryKind::Location, file.locations),
            (InventoryKind::Stamp, file.stamps),
        ];
        for (kind, items) in sections {
            for item in items {
                catalog.insert(kind, item);
            }
        }
        for postcard in file.postcards {
            catalog.postcards.insert(postcard.id, postcard);
        }
        for room in file.rooms {
            catalog.rooms.insert(room.id, room);
        }

        Ok(catalog)
    }

    /// Load the catalog from a file, falling back to an empty catalog
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Catalog file not found, starting with an empty catalog");
            return Ok(Self::new());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_json(&content)?;

        info!(
            path = %path.display(),
            items = catalog.len(),
            postcards = catalog.postcards.len(),
            rooms = catalog.rooms.len(),
            "Item catalog loaded"
        );

        Ok(catalog)
    }

    /// Add or replace a descriptor
    pub fn insert(&mut self, kind: InventoryKind, item: ItemDescriptor) {
        self.entries.entry(kind).or_default().insert(item.id, item);
    }

    /// Add or replace a postcard template
    pub fn insert_postcard(&mut self, postcard: ItemDescriptor) {
        self.postcards.insert(postcard.id, postcard);
    }

    /// Look up an item in one inventory's section
    pub fn get(&self, kind: InventoryKind, id: ItemId) -> Option<&ItemDescriptor> {
        self.entries.get(&kind).and_then(|items| items.get(&id))
    }

    /// Look up a postcard template
    pub fn postcard(&self, id: ItemId) -> Option<&ItemDescriptor> {
        self.postcards.get(&id)
    }

    pub fn insert_room(&mut self, id: RoomId, name: &str) {
        self.rooms.insert(
            id,
            RoomDescriptor {
                id,
                name: name.to_string(),
            },
        );
    }

    pub fn room(&self, id: RoomId) -> Option<&RoomDescriptor> {
        self.rooms.get(&id)
    }

    /// Total number of item descriptors (postcards excluded)
    pub fn len(&self) -> usize {
        self.entries.values().map(|items| items.len()).sum()
    }

    /// Check if the catalog has no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let item = ItemDescriptor::new(413, "Blue Hoodie")
            .cost(250)
            .max_quantity(3)
            .epf(true);

        assert_eq!(item.id, 413);
        assert_eq!(item.name, "Blue Hoodie");
        assert_eq!(item.cost, 250);
        assert_eq!(item.max_quantity, Some(3));
        assert!(item.epf);
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"{
            "items": [{"id": 1, "name": "Blue", "cost": 20}, {"id": 800, "name": "Spy Phone", "cost": 5, "epf": true}],
            "furniture": [{"id": 305, "name": "Couch", "cost": 100, "max_quantity": 5}],
            "postcards": [{"id": 112, "name": "Welcome"}],
            "rooms": [{"id": 100, "name": "Town"}]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get(InventoryKind::Clothing, 1).unwrap().cost, 20);
        assert!(catalog.get(InventoryKind::Clothing, 800).unwrap().epf);
        assert_eq!(
            catalog
                .get(InventoryKind::Furniture, 305)
                .unwrap()
                .max_quantity,
            Some(5)
        );
        assert!(catalog.get(InventoryKind::Igloo, 1).is_none());
        assert_eq!(catalog.postcard(112).unwrap().name, "Welcome");
        assert_eq!(catalog.room(100).unwrap().name, "Town");
        assert!(catalog.room(200).is_none());
    }

    #[test]
    fn test_catalog_rejects_bad_json() {
        assert!(Catalog::from_json("{ not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_catalog_is_empty() {
        let catalog = Catalog::load(Path::new("./does/not/exist.json"))
            .await
            .unwrap();
        assert!(catalog.is_empty());
    }
}
