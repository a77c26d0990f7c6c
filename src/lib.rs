//! Real-time message relay.
//!
//! Named clients hold a websocket open to the relay, join ad-hoc rooms, and
//! exchange direct messages, room broadcasts and call-signaling payloads.
//! [`Relay`] is the shared state every session and HTTP handler works on.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod connection;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod rooms;
pub mod router;
pub mod session;

pub use config::Config;
pub use connection::Connection;
pub use envelope::{Inbound, Outbound, OutboundKind};
pub use error::{ConfigError, DeliveryError, DirectoryError};
pub use registry::Registry;
pub use rooms::Rooms;

/// Who is connected and who is in which room.
#[derive(Clone, Default)]
pub struct Relay {
    pub registry: Registry,
    pub rooms: Rooms,
    config: Arc<Config>,
}

impl Relay {
    pub fn new(config: Config) -> Relay {
        Relay {
            registry: Registry::default(),
            rooms: Rooms::default(),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
