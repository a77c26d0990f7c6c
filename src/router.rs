use crate::{
    connection::{self, Connection},
    envelope::{Inbound, Outbound},
    Relay,
};

/// Routes one decoded envelope from `sender`.
///
/// Misses (unknown user or room) are dropped silently and nothing here can
/// fail the sender's session.
pub async fn dispatch(relay: &Relay, sender: &Connection, envelope: Inbound) {
    let from = sender.username();
    match envelope {
        Inbound::Direct { to, message } => {
            send_direct(relay, &to, &Outbound::chat(from, message)).await
        }
        Inbound::Room { to, message } => {
            relay
                .rooms
                .broadcast(&to, sender, &Outbound::chat(from, message))
                .await
        }
        Inbound::Join { to } => relay.rooms.join(sender, &to).await,
        Inbound::Leave { to } => relay.rooms.leave(sender, &to).await,
        Inbound::WebrtcSignal { to, signal } => {
            send_direct(relay, &to, &Outbound::signal(from, signal)).await
        }
        Inbound::StartRoomCall { to } => {
            relay
                .rooms
                .broadcast(&to, sender, &Outbound::call_started(from))
                .await
        }
        Inbound::EndRoomCall { to } => {
            relay
                .rooms
                .broadcast(&to, sender, &Outbound::call_ended(from))
                .await
        }
        Inbound::Unknown => log::debug!("ignoring envelope of unknown type from {}", from),
    }
}

async fn send_direct(relay: &Relay, to: &str, envelope: &Outbound) {
    match relay.registry.lookup(to).await {
        Some(recipient) => connection::deliver_to(&recipient, envelope),
        None => log::debug!("dropping {:?} for unknown user {}", envelope.kind, to),
    }
}
