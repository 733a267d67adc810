//! Protocol module
//!
//! Wire format shared by the network layer and the game notifications:
//! - XT message encoding (server -> client)
//! - XT packet parsing (client -> server)

pub mod xt;

pub use xt::{strip_separators, XtMessage, XtPacket};
