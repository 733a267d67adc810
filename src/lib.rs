//! Waddle Game Server Library
//!
//! This library provides the core functionality for the Waddle world server:
//! player inventories and currencies, equipment, rooms, mail and permissions,
//! plus the XT protocol and network handling around them.
//!
//! ## Modules
//!
//! - `cache` - Derived per-player cache invalidation (memory, Redis)
//! - `config` - Server configuration management
//! - `error` - Error types and result definitions
//! - `game` - Player mutation engines and their collaborators
//! - `net` - Network handling and session management
//! - `protocol` - XT protocol implementation

pub mod cache;
pub mod config;
pub mod error;
pub mod game;
pub mod net;
pub mod protocol;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{Result, WaddleError};
pub use state::AppState;

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
