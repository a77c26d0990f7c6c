use std::net::SocketAddr;

use crate::error::ConfigError;

pub const ADDR_VAR: &str = "RELAY_ADDR";
pub const OUTBOUND_CAPACITY_VAR: &str = "RELAY_OUTBOUND_CAPACITY";

/// Runtime settings for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the HTTP/websocket server binds to.
    pub addr: SocketAddr,
    /// Number of envelopes buffered per connection before new ones are dropped.
    pub outbound_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            outbound_capacity: 64,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup, falling back to
    /// defaults for anything unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(value) = lookup(ADDR_VAR) {
            config.addr = value
                .trim()
                .parse()
                .map_err(|source| ConfigError::Addr { value: value.clone(), source })?;
        }

        if let Some(value) = lookup(OUTBOUND_CAPACITY_VAR) {
            config.outbound_capacity = match value.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => return Err(ConfigError::Capacity(value)),
            };
        }

        Ok(config)
    }
}
