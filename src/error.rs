use thiserror::Error;
use warp::http::StatusCode;

/// Failures surfaced to callers of the directory query service.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Room already exists")]
    RoomExists,
    #[error("Invalid create type")]
    InvalidCreateType,
}

impl DirectoryError {
    pub fn status(&self) -> StatusCode {
        match self {
            DirectoryError::RoomExists => StatusCode::CONFLICT,
            DirectoryError::InvalidCreateType => StatusCode::BAD_REQUEST,
        }
    }
}

/// Why an envelope could not be queued for a recipient.
///
/// These never leave the fan-out helpers: delivery is best effort and a
/// failure for one recipient is only logged.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("connection is closed")]
    Closed,
    #[error("outbound queue is full")]
    Backlogged,
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid RELAY_ADDR {value:?}: {source}")]
    Addr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid RELAY_OUTBOUND_CAPACITY {0:?}: expected a positive integer")]
    Capacity(String),
}
