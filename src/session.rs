use std::time::{Duration, Instant};

use futures::TryFutureExt;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use warp::ws::{Message, WebSocket};

use crate::{connection::Connection, envelope::Inbound, router, Relay};

/// Runs one client connection from registration to cleanup.
pub async fn user_connected(ws: WebSocket, relay: Relay, username: String) {
    // Split the socket into a sender and receive of messages.
    let (mut user_ws_tx, mut user_ws_rx) = ws.split();

    // A bounded queue sits between routing and the socket so a slow client
    // only ever loses its own messages.
    let (tx, rx) = mpsc::channel::<Message>(relay.config().outbound_capacity);
    let mut rx = ReceiverStream::new(rx);

    tokio::task::spawn(async move {
        while let Some(message) = rx.next().await {
            let closing = message.is_close();
            user_ws_tx
                .send(message)
                .unwrap_or_else(|e| {
                    log::warn!("websocket send error: {}", e);
                })
                .await;
            if closing {
                break;
            }
        }
        if let Err(e) = user_ws_tx.close().await {
            log::debug!("websocket close error: {}", e);
        }
    });

    let connection = Connection::new(username, tx);
    let started = Instant::now();

    if let Some(previous) = relay.registry.register(connection.clone()).await {
        log::info!(
            "{} reconnected, evicting connection {}",
            previous.username(),
            previous.id()
        );
        previous.evict();
    }

    let guard = SessionGuard::new(relay.clone(), connection.clone());

    loop {
        let result = tokio::select! {
            _ = connection.evicted() => break,
            next = user_ws_rx.next() => match next {
                Some(result) => result,
                None => break,
            },
        };

        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("websocket error({}): {}", connection.username(), e);
                break;
            }
        };

        if msg.is_close() {
            break;
        }
        // Skip any non-Text messages...
        let text = match msg.to_str() {
            Ok(text) => text,
            Err(_) => continue,
        };

        match Inbound::decode(text) {
            Ok(envelope) => router::dispatch(&relay, &connection, envelope).await,
            Err(e) => log::error!("malformed envelope from {}: {}", connection.username(), e),
        }
    }

    guard.finish().await;
    log::info!(
        "good bye {} (connected {})",
        connection.username(),
        humantime::format_duration(Duration::from_secs(started.elapsed().as_secs()))
    );
}

/// Unregisters a connection and removes it from every room, exactly once.
pub async fn user_disconnected(relay: &Relay, connection: &Connection) {
    relay.registry.unregister_connection(connection).await;
    let rooms = relay.rooms.remove_everywhere(connection).await;
    connection.close();
    log::debug!(
        "cleaned up {} (connection {}, {} rooms)",
        connection.username(),
        connection.id(),
        rooms
    );
}

/// Makes sure cleanup still happens if the session future is dropped at any
/// await point instead of running to the end.
struct SessionGuard {
    armed: Option<(Relay, Connection)>,
}

impl SessionGuard {
    fn new(relay: Relay, connection: Connection) -> SessionGuard {
        SessionGuard {
            armed: Some((relay, connection)),
        }
    }

    async fn finish(mut self) {
        if let Some((relay, connection)) = self.armed.take() {
            user_disconnected(&relay, &connection).await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some((relay, connection)) = self.armed.take() {
            connection.close();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move { user_disconnected(&relay, &connection).await });
            }
        }
    }
}
