//! Networking module
//!
//! This module handles all network-related functionality for the Waddle server:
//! - TCP socket handling and NUL-delimited framing
//! - Session management
//! - Outbound notifications to players and rooms
//! - Connection lifecycle

pub mod buffer;
pub mod handler;
pub mod notifier;
pub mod session;
