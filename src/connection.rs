use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    Notify,
};
use warp::ws::Message;

use crate::{envelope::Outbound, error::DeliveryError};

/// Our global unique connection id counter.
static NEXT_CONNECTION_ID: AtomicUsize = AtomicUsize::new(1);

/// Handle to one live client connection.
///
/// Clones share the same outbound queue; the session's writer task is the
/// only thing that touches the websocket sink. Two handles are equal when
/// they refer to the same connection, regardless of username.
#[derive(Clone)]
pub struct Connection {
    id: usize,
    username: Arc<str>,
    tx: mpsc::Sender<Message>,
    closed: Arc<AtomicBool>,
    evicted: Arc<Notify>,
}

impl Connection {
    pub fn new(username: impl Into<Arc<str>>, tx: mpsc::Sender<Message>) -> Connection {
        Connection {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            username: username.into(),
            tx,
            closed: Arc::new(AtomicBool::new(false)),
            evicted: Arc::new(Notify::new()),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn deliver(&self, envelope: &Outbound) -> Result<(), DeliveryError> {
        let text = serde_json::to_string(envelope)?;
        self.send(Message::text(text))
    }

    fn send(&self, message: Message) -> Result<(), DeliveryError> {
        if self.is_closed() {
            return Err(DeliveryError::Closed);
        }
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Backlogged,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Stops all further delivery and asks the writer to close the socket.
    /// Only the first call has any effect.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        // A full queue still gets closed once every sender is dropped.
        let _ = self.tx.try_send(Message::close());
        true
    }

    /// Closes the connection and wakes its session so it terminates.
    pub fn evict(&self) {
        self.close();
        self.evicted.notify_one();
    }

    pub async fn evicted(&self) {
        self.evicted.notified().await
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Connection {}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Delivers one envelope to every recipient, encoding it once.
///
/// Best effort: a recipient that is closed or backlogged is skipped and the
/// rest still get the message.
pub fn fan_out<'a, I>(recipients: I, envelope: &Outbound)
where
    I: IntoIterator<Item = &'a Connection>,
{
    let text = match serde_json::to_string(envelope) {
        Ok(text) => text,
        Err(e) => {
            log::error!("failed to encode {:?} envelope: {}", envelope.kind, e);
            return;
        }
    };

    for recipient in recipients {
        if let Err(e) = recipient.send(Message::text(text.clone())) {
            log_delivery_error(recipient, &e);
        }
    }
}

/// Delivers one envelope to a single recipient, logging any failure.
pub fn deliver_to(recipient: &Connection, envelope: &Outbound) {
    if let Err(e) = recipient.deliver(envelope) {
        log_delivery_error(recipient, &e);
    }
}

fn log_delivery_error(recipient: &Connection, error: &DeliveryError) {
    match error {
        DeliveryError::Closed => {
            log::debug!("dropping message for closed connection {}", recipient.username())
        }
        DeliveryError::Backlogged => log::warn!(
            "outbound queue full for {} (connection {}), message dropped",
            recipient.username(),
            recipient.id()
        ),
        DeliveryError::Encode(e) => log::error!("failed to encode envelope: {}", e),
    }
}
