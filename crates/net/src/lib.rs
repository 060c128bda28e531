//! Realtime relay layer
//!
//! A lightweight TCP relay that fans chat messages out to everyone
//! currently viewing a group. Events are JSON in length-prefixed
//! frames. The relay holds no persistent state of its own; the
//! [`rooms::RoomRegistry`] it shares with the HTTP layer is the only
//! coupling between the two.

pub mod client;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod relay;
pub mod rooms;

pub use client::RelayClient;
pub use error::{Error, Result};
pub use protocol::{ChatPayload, ClientEvent, ServerEvent};
pub use relay::Relay;
pub use rooms::RoomRegistry;

/// Default relay port
pub const DEFAULT_RELAY_PORT: u16 = 4400;
