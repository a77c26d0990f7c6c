use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    connection::{self, Connection},
    envelope::Outbound,
    error::DirectoryError,
};

/// Room name -> members in join order.
///
/// One lock covers both the map and every member list, so membership
/// changes and the notices they fan out are serialized per room.
#[derive(Clone, Default)]
pub struct Rooms {
    rooms: Arc<RwLock<HashMap<String, Vec<Connection>>>>,
}

impl Rooms {
    /// Creates an empty room, failing if the name is taken.
    pub async fn create(&self, name: &str) -> Result<(), DirectoryError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(name) {
            return Err(DirectoryError::RoomExists);
        }
        rooms.insert(name.to_owned(), Vec::new());
        log::info!("room created: {}", name);
        Ok(())
    }

    /// Adds `connection` to the room (creating it if needed) and notifies the
    /// other members. Joining a room twice is a no-op.
    pub async fn join(&self, connection: &Connection, room: &str) {
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(room.to_owned()).or_insert_with(Vec::new);
        if members.contains(connection) {
            return;
        }
        members.push(connection.clone());

        log::debug!("{} joined room {}", connection.username(), room);
        // Enqueueing never blocks, so notices go out under the lock and every
        // member sees membership changes in the same order.
        connection::fan_out(
            members.iter().filter(|m| *m != connection),
            &Outbound::joined_room(connection.username()),
        );
    }

    /// Removes `connection` from the room and notifies whoever remains.
    /// Nothing happens if it was not a member.
    pub async fn leave(&self, connection: &Connection, room: &str) {
        let mut rooms = self.rooms.write().await;
        let members = match rooms.get_mut(room) {
            Some(members) => members,
            None => return,
        };
        let position = match members.iter().position(|m| m == connection) {
            Some(position) => position,
            None => return,
        };
        members.remove(position);

        log::debug!("{} left room {}", connection.username(), room);
        connection::fan_out(members.iter(), &Outbound::left_room(connection.username()));
    }

    /// Drops `connection` from every room it belongs to, without notices.
    /// Returns how many rooms it was removed from.
    pub async fn remove_everywhere(&self, connection: &Connection) -> usize {
        let mut removed = 0;
        for members in self.rooms.write().await.values_mut() {
            if let Some(position) = members.iter().position(|m| m == connection) {
                members.remove(position);
                removed += 1;
            }
        }
        removed
    }

    /// Snapshot of the room's members in join order; empty for unknown rooms.
    pub async fn members(&self, room: &str) -> Vec<Connection> {
        self.rooms
            .read()
            .await
            .get(room)
            .cloned()
            .unwrap_or_default()
    }

    /// Sends `envelope` to every member of `room` except `sender`.
    ///
    /// Takes the write lock so broadcasts into one room are delivered in a
    /// single order relative to each other and to joins and leaves.
    pub async fn broadcast(&self, room: &str, sender: &Connection, envelope: &Outbound) {
        let rooms = self.rooms.write().await;
        match rooms.get(room) {
            Some(members) => connection::fan_out(members.iter().filter(|m| *m != sender), envelope),
            None => log::debug!("dropping {:?} for unknown room {}", envelope.kind, room),
        }
    }

    /// Case-insensitive substring match over room names.
    pub async fn search(&self, query: &str) -> Vec<String> {
        let query = query.to_lowercase();
        let mut names: Vec<String> = self
            .rooms
            .read()
            .await
            .keys()
            .filter(|name| name.to_lowercase().contains(&query))
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub async fn contains(&self, room: &str) -> bool {
        self.rooms.read().await.contains_key(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connection::tests::{received, test_connection},
        envelope::OutboundKind,
    };

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let rooms = Rooms::default();
        assert_eq!(rooms.create("alpha").await, Ok(()));
        assert_eq!(rooms.create("alpha").await, Err(DirectoryError::RoomExists));
        assert!(rooms.members("alpha").await.is_empty());
    }

    #[tokio::test]
    async fn join_creates_room_and_notifies_others_only() {
        let rooms = Rooms::default();
        let (alice, mut alice_rx) = test_connection("alice");
        let (bob, mut bob_rx) = test_connection("bob");

        rooms.join(&alice, "lobby").await;
        assert!(rooms.contains("lobby").await);
        rooms.join(&bob, "lobby").await;

        let got = received(&mut alice_rx);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].from, "bob");
        assert_eq!(got[0].kind, OutboundKind::NewUser);
        assert_eq!(got[0].message.as_deref(), Some("bob joined the room"));
        assert!(received(&mut bob_rx).is_empty());

        assert_eq!(rooms.members("lobby").await, vec![alice, bob]);
    }

    #[tokio::test]
    async fn joining_twice_keeps_one_entry() {
        let rooms = Rooms::default();
        let (alice, _alice_rx) = test_connection("alice");
        let (bob, mut bob_rx) = test_connection("bob");
        rooms.join(&bob, "lobby").await;

        rooms.join(&alice, "lobby").await;
        rooms.join(&alice, "lobby").await;

        assert_eq!(rooms.members("lobby").await.len(), 2);
        assert_eq!(received(&mut bob_rx).len(), 1);
    }

    #[tokio::test]
    async fn join_then_leave_restores_membership() {
        let rooms = Rooms::default();
        let (alice, mut alice_rx) = test_connection("alice");
        let (bob, _bob_rx) = test_connection("bob");
        rooms.join(&alice, "lobby").await;
        let before = rooms.members("lobby").await;

        rooms.join(&bob, "lobby").await;
        rooms.leave(&bob, "lobby").await;

        assert_eq!(rooms.members("lobby").await, before);
        let got = received(&mut alice_rx);
        assert_eq!(got.len(), 2);
        assert_eq!(got[1].kind, OutboundKind::Leave);
        assert_eq!(got[1].from, "bob");
        assert_eq!(got[1].message.as_deref(), Some("bob left the room"));
    }

    #[tokio::test]
    async fn leave_by_non_member_is_silent() {
        let rooms = Rooms::default();
        let (alice, mut alice_rx) = test_connection("alice");
        let (bob, _bob_rx) = test_connection("bob");
        rooms.join(&alice, "lobby").await;

        rooms.leave(&bob, "lobby").await;
        rooms.leave(&bob, "nowhere").await;

        assert_eq!(rooms.members("lobby").await, vec![alice]);
        assert!(received(&mut alice_rx).is_empty());
        assert!(!rooms.contains("nowhere").await);
    }

    #[tokio::test]
    async fn remove_everywhere_is_silent() {
        let rooms = Rooms::default();
        let (alice, mut alice_rx) = test_connection("alice");
        let (bob, _bob_rx) = test_connection("bob");
        for room in &["one", "two", "three"] {
            rooms.join(&alice, room).await;
            rooms.join(&bob, room).await;
        }
        received(&mut alice_rx);

        assert_eq!(rooms.remove_everywhere(&bob).await, 3);
        for room in &["one", "two", "three"] {
            assert_eq!(rooms.members(room).await, vec![alice.clone()]);
        }
        assert!(received(&mut alice_rx).is_empty());
        assert_eq!(rooms.remove_everywhere(&bob).await, 0);
    }

    #[tokio::test]
    async fn broadcast_skips_sender() {
        let rooms = Rooms::default();
        let (alice, mut alice_rx) = test_connection("alice");
        let (bob, mut bob_rx) = test_connection("bob");
        let (carol, mut carol_rx) = test_connection("carol");
        rooms.join(&alice, "lobby").await;
        rooms.join(&bob, "lobby").await;
        rooms.join(&carol, "lobby").await;
        received(&mut alice_rx);
        received(&mut bob_rx);

        rooms
            .broadcast("lobby", &alice, &Outbound::chat("alice", "hi".into()))
            .await;
        rooms
            .broadcast("missing", &alice, &Outbound::chat("alice", "lost".into()))
            .await;

        assert!(received(&mut alice_rx).is_empty());
        assert_eq!(received(&mut bob_rx).len(), 1);
        assert_eq!(received(&mut carol_rx).len(), 1);
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let rooms = Rooms::default();
        rooms.create("Rust").await.unwrap();
        rooms.create("trusty").await.unwrap();
        rooms.create("go").await.unwrap();

        assert_eq!(rooms.search("RUST").await, vec!["Rust", "trusty"]);
        assert!(rooms.search("python").await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_are_not_lost() {
        let rooms = Rooms::default();
        let mut receivers = Vec::new();
        let mut tasks = Vec::new();
        for i in 0..50 {
            let (tx, rx) = tokio::sync::mpsc::channel(64);
            receivers.push(rx);
            let conn = Connection::new(format!("user{}", i), tx);
            let rooms = rooms.clone();
            tasks.push(tokio::spawn(async move {
                rooms.join(&conn, "fresh").await;
            }));
        }
        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        let members = rooms.members("fresh").await;
        assert_eq!(members.len(), 50);
        let mut ids: Vec<usize> = members.iter().map(Connection::id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn members_see_one_order_of_notices() {
        let rooms = Rooms::default();
        let (watcher, mut watcher_rx) = {
            let (tx, rx) = tokio::sync::mpsc::channel(512);
            (Connection::new("watcher", tx), rx)
        };
        let (other, mut other_rx) = {
            let (tx, rx) = tokio::sync::mpsc::channel(512);
            (Connection::new("other", tx), rx)
        };
        rooms.join(&watcher, "lobby").await;
        rooms.join(&other, "lobby").await;
        received(&mut watcher_rx);

        let mut tasks = Vec::new();
        for i in 0..20 {
            let rooms = rooms.clone();
            let (tx, rx) = tokio::sync::mpsc::channel(512);
            let conn = Connection::new(format!("user{}", i), tx);
            tasks.push(tokio::spawn(async move {
                rooms.join(&conn, "lobby").await;
                rooms
                    .broadcast("lobby", &conn, &Outbound::chat(conn.username(), "hi".into()))
                    .await;
                rooms.leave(&conn, "lobby").await;
                drop(rx);
            }));
        }
        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        let seen_by_watcher = received(&mut watcher_rx);
        let seen_by_other = received(&mut other_rx);
        assert_eq!(seen_by_watcher.len(), 60);
        assert_eq!(seen_by_watcher, seen_by_other);
        assert_eq!(rooms.members("lobby").await, vec![watcher, other]);
    }
}
