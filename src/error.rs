//! Error handling module
//!
//! Defines custom error types for the Waddle server.

use std::io;

use thiserror::Error;

/// Main error type for the Waddle server
#[derive(Error, Debug)]
pub enum WaddleError {
    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Protocol-related errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Game logic errors
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    /// Persistence errors (store writes and reads)
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Derived cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Network-specific errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection timeout")]
    Timeout,

    #[error("Too many connections from {0}")]
    TooManyConnections(String),

    #[error("Session not found: {0}")]
    SessionNotFound(u64),

    #[error("Write buffer full")]
    WriteBufferFull,
}

/// Protocol-specific errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("Unknown handler: {0}")]
    UnknownHandler(String),

    #[error("Packet too large: {size} bytes (max: {max})")]
    PacketTooLarge { size: usize, max: usize },

    #[error("Invalid argument {index}: {value}")]
    InvalidArgument { index: usize, value: String },

    #[error("Packet received before login")]
    NotLoggedIn,
}

/// Game logic errors
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Invalid player state: {0}")]
    InvalidPlayerState(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid item: {0}")]
    InvalidItem(u32),

    #[error("Room not found: {0}")]
    RoomNotFound(u32),

    #[error("World full")]
    WorldFull,
}

/// Persistence collaborator errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Write rejected: {0}")]
    Rejected(String),
}

impl From<redis::RedisError> for WaddleError {
    fn from(err: redis::RedisError) -> Self {
        WaddleError::Cache(err.to_string())
    }
}

/// Result type alias for Waddle operations
pub type Result<T> = std::result::Result<T, WaddleError>;

/// Error codes sent to the client in an `e` message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ClientErrorCode {
    /// The item is already in the player's inventory
    AlreadyOwned = 400,
    /// Not enough coins (or agent medals)
    InsufficientFunds = 401,
    /// The item does not exist or may not be bought this way
    ItemNotAvailable = 402,
    /// Quantity limit for the item reached
    CapReached = 403,
}

impl ClientErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}
