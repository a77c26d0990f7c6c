//! Search and create operations behind the HTTP directory endpoints.

use serde::Deserialize;

use crate::{error::DirectoryError, Relay};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateRequest {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

/// Names of connected users or rooms containing `q`, ignoring case.
/// An unrecognized `type` matches nothing.
pub async fn search(relay: &Relay, query: &SearchQuery) -> Vec<String> {
    match query.kind.as_str() {
        "user" => relay.registry.search(&query.q).await,
        "room" => relay.rooms.search(&query.q).await,
        _ => Vec::new(),
    }
}

pub async fn create(relay: &Relay, request: &CreateRequest) -> Result<(), DirectoryError> {
    match request.kind.as_str() {
        "room" => relay.rooms.create(&request.name).await,
        _ => Err(DirectoryError::InvalidCreateType),
    }
}
