//! Game module
//!
//! This module contains the player mutation core of the Waddle server:
//! - Acquisition of catalog items into typed inventories
//! - Currency accounts (coins, agent medals)
//! - Equipment slots broadcast to the room
//! - Room entry, inbox mail and permission grants
//! - Persistence, room membership and audit collaborators

pub mod acquisition;
pub mod actions;
pub mod audit;
pub mod category;
pub mod currency;
pub mod equipment;
pub mod inventory;
pub mod item;
pub mod persistence;
pub mod player;
pub mod room;
pub mod services;

/// Player (penguin) ID
pub type PlayerId = u32;

/// Catalog item ID
pub type ItemId = u32;

/// Room ID
pub type RoomId = u32;

/// Mail record ID
pub type MailId = u32;

pub use acquisition::{Acquisition, AcquisitionEngine};
pub use actions::{MailSender, PlayerActions};
pub use category::Category;
pub use equipment::{EquipmentManager, EquipmentSlot};
pub use player::{Player, PlayerManager};
pub use services::Services;
