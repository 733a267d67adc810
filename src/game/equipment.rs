//! Equipment module
//!
//! This module handles what a player's avatar is wearing:
//! - 9 single-valued slots (color, head, face, neck, body, hand, feet, flag, photo)
//! - Persisting a slot change and broadcasting it to the player's room
//!
//! Ownership is not checked here; callers verify it before equipping.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::game::item::ItemDescriptor;
use crate::game::player::Player;
use crate::game::services::Services;
use crate::game::ItemId;
use crate::protocol::XtMessage;

/// Number of equipment slots
pub const EQUIPMENT_SLOT_COUNT: usize = 9;

/// Avatar equipment slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EquipmentSlot {
    Color = 0,
    Head = 1,
    Face = 2,
    Neck = 3,
    Body = 4,
    Hand = 5,
    Feet = 6,
    Flag = 7,
    Photo = 8,
}

impl EquipmentSlot {
    /// All slots in index order
    pub fn all() -> &'static [EquipmentSlot] {
        &[
            EquipmentSlot::Color,
            EquipmentSlot::Head,
            EquipmentSlot::Face,
            EquipmentSlot::Neck,
            EquipmentSlot::Body,
            EquipmentSlot::Hand,
            EquipmentSlot::Feet,
            EquipmentSlot::Flag,
            EquipmentSlot::Photo,
        ]
    }

    /// Slot name, also the database column
    pub fn name(&self) -> &'static str {
        match self {
            EquipmentSlot::Color => "color",
            EquipmentSlot::Head => "head",
            EquipmentSlot::Face => "face",
            EquipmentSlot::Neck => "neck",
            EquipmentSlot::Body => "body",
            EquipmentSlot::Hand => "hand",
            EquipmentSlot::Feet => "feet",
            EquipmentSlot::Flag => "flag",
            EquipmentSlot::Photo => "photo",
        }
    }

    /// Opcode broadcast when the slot changes
    pub fn opcode(&self) -> &'static str {
        match self {
            EquipmentSlot::Color => "upc",
            EquipmentSlot::Head => "uph",
            EquipmentSlot::Face => "upf",
            EquipmentSlot::Neck => "upn",
            EquipmentSlot::Body => "upb",
            EquipmentSlot::Hand => "upa",
            EquipmentSlot::Feet => "upe",
            EquipmentSlot::Flag => "upl",
            EquipmentSlot::Photo => "upp",
        }
    }

    /// Slot for an update opcode (inbound `s#upX` uses the same suffix)
    pub fn from_opcode(opcode: &str) -> Option<Self> {
        Self::all().iter().copied().find(|slot| slot.opcode() == opcode)
    }

    /// How the slot is described in audit lines
    fn audit_label(&self) -> &'static str {
        match self {
            EquipmentSlot::Color => "color",
            EquipmentSlot::Head => "head item",
            EquipmentSlot::Face => "face item",
            EquipmentSlot::Neck => "neck item",
            EquipmentSlot::Body => "body item",
            EquipmentSlot::Hand => "hand item",
            EquipmentSlot::Feet => "feet item",
            EquipmentSlot::Flag => "flag item",
            EquipmentSlot::Photo => "background",
        }
    }
}

impl std::fmt::Display for EquipmentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What the avatar currently wears
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    slots: [Option<ItemId>; EQUIPMENT_SLOT_COUNT],
}

impl Equipment {
    /// Nothing equipped
    pub fn new() -> Self {
        Self::default()
    }

    /// Item in a slot
    pub fn get(&self, slot: EquipmentSlot) -> Option<ItemId> {
        self.slots[slot as usize]
    }

    /// Overwrite a slot
    pub fn set(&mut self, slot: EquipmentSlot, item_id: Option<ItemId>) {
        self.slots[slot as usize] = item_id;
    }

    /// Check if a slot is empty
    pub fn is_empty(&self, slot: EquipmentSlot) -> bool {
        self.get(slot).is_none()
    }
}

/// Persists slot changes and tells the room about them
pub struct EquipmentManager {
    services: Services,
}

impl EquipmentManager {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Put `item` in `slot`, or clear it with `None`
    pub async fn set_slot(
        &self,
        player: &Player,
        slot: EquipmentSlot,
        item: Option<&ItemDescriptor>,
    ) -> Result<()> {
        let mut state = player.lock().await;
        let item_id = item.map(|item| item.id);

        self.services
            .store
            .set_slot(player.id, slot, item_id)
            .await?;
        state.equipment.set(slot, item_id);

        match player.room() {
            Some(room_id) => {
                let message = XtMessage::new(slot.opcode())
                    .arg(player.id)
                    .arg(item_id.unwrap_or(0));
                if let Err(e) = self
                    .services
                    .notifier
                    .broadcast_to_room(room_id, &message)
                    .await
                {
                    warn!(
                        player_id = player.id,
                        room_id = room_id,
                        slot = %slot,
                        error = %e,
                        "Failed to broadcast equipment change"
                    );
                }
            }
            None => debug!(
                player_id = player.id,
                slot = %slot,
                "Player not in a room, equipment change not broadcast"
            ),
        }

        let line = match item {
            Some(item) => format!(
                "{} updated their {} to '{}'",
                player.username,
                slot.audit_label(),
                item.name
            ),
            None => format!("{} removed their {}", player.username, slot.audit_label()),
        };
        self.services.audit.record(&line);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_opcodes() {
        let opcodes: Vec<&str> = EquipmentSlot::all().iter().map(|s| s.opcode()).collect();
        assert_eq!(
            opcodes,
            vec!["upc", "uph", "upf", "upn", "upb", "upa", "upe", "upl", "upp"]
        );
        assert_eq!(EquipmentSlot::from_opcode("upa"), Some(EquipmentSlot::Hand));
        assert_eq!(EquipmentSlot::from_opcode("upz"), None);
    }

    #[test]
    fn test_equipment_overwrites() {
        let mut equipment = Equipment::new();
        assert!(equipment.is_empty(EquipmentSlot::Head));

        equipment.set(EquipmentSlot::Head, Some(413));
        equipment.set(EquipmentSlot::Head, Some(414));
        assert_eq!(equipment.get(EquipmentSlot::Head), Some(414));

        equipment.set(EquipmentSlot::Head, None);
        assert!(equipment.is_empty(EquipmentSlot::Head));
        assert!(equipment.is_empty(EquipmentSlot::Feet));
    }

    #[test]
    fn test_slot_columns() {
        assert_eq!(EquipmentSlot::Photo.name(), "photo");
        assert_eq!(EquipmentSlot::Photo.audit_label(), "background");
        assert_eq!(EquipmentSlot::all().len(), EQUIPMENT_SLOT_COUNT);
    }
}
