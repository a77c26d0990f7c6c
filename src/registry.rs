use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    connection::{self, Connection},
    envelope::Outbound,
};

/// Our state of currently connected users.
///
/// - Key is their username
/// - Value is the handle of their live connection
#[derive(Clone, Default)]
pub struct Registry {
    users: Arc<RwLock<HashMap<String, Connection>>>,
}

impl Registry {
    /// Registers `connection` under its username and tells everyone else
    /// that a new user arrived.
    ///
    /// A connection already registered under the same name is replaced and
    /// returned so the caller can evict it.
    pub async fn register(&self, connection: Connection) -> Option<Connection> {
        let (previous, others) = {
            let mut users = self.users.write().await;
            let previous = users.insert(connection.username().to_owned(), connection.clone());
            let others: Vec<Connection> = users
                .values()
                .filter(|c| **c != connection)
                .cloned()
                .collect();
            (previous, others)
        };

        log::info!(
            "registered {} (connection {})",
            connection.username(),
            connection.id()
        );
        connection::fan_out(&others, &Outbound::user_connected(connection.username()));

        previous.filter(|p| *p != connection)
    }

    pub async fn lookup(&self, username: &str) -> Option<Connection> {
        self.users.read().await.get(username).cloned()
    }

    pub async fn unregister(&self, username: &str) -> Option<Connection> {
        self.users.write().await.remove(username)
    }

    /// Removes the entry for this connection's username, but only while it
    /// still points at this connection and not at a newer replacement.
    pub async fn unregister_connection(&self, connection: &Connection) -> bool {
        let mut users = self.users.write().await;
        match users.get(connection.username()) {
            Some(current) if current == connection => {
                users.remove(connection.username());
                true
            }
            _ => false,
        }
    }

    /// Case-insensitive substring match over registered usernames.
    pub async fn search(&self, query: &str) -> Vec<String> {
        let query = query.to_lowercase();
        let mut names: Vec<String> = self
            .users
            .read()
            .await
            .keys()
            .filter(|name| name.to_lowercase().contains(&query))
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}
