//! Outbound message delivery.
//!
//! Every player owns a bounded outbox. Queueing a message never blocks,
//! so game code can send while it holds the session lock. A writer task
//! per player drains the outbox into the connection in order. When a send
//! fails, the outbox is full, or it has already been abandoned by its
//! writer, the player's id goes onto the eviction channel and a separate
//! task removes them. A peer that stops reading therefore fills its
//! outbox and is evicted. Nothing on the delivery path ever takes the
//! session lock.

use std::sync::Arc;

use tilepath_protocol::{Codec, Message, PlayerId};
use tilepath_transport::Connection;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::SessionError;
use crate::state::{EvictionSender, SessionState};

/// Messages a player may have queued but not yet written. Enough for a
/// full round's replay on the largest board.
pub(crate) const OUTBOX_CAPACITY: usize = 1024;

/// Channel sender for delivering outbound messages to a player.
pub(crate) type PlayerSender = mpsc::Sender<Message>;

impl<B, C> SessionState<B, C> {
    /// Queues `msg` for one player.
    pub(crate) fn send_to(&self, id: PlayerId, msg: Message) {
        let Some(player) = self.players.get(&id) else {
            return;
        };
        match player.outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(player_id = %id, "outbox full, evicting");
                let _ = self.evictions.send(id);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(player_id = %id, "outbox closed, evicting");
                let _ = self.evictions.send(id);
            }
        }
    }

    /// Queues `msg` for every connected player, in connection order.
    pub(crate) fn broadcast(&self, msg: &Message) {
        for &id in &self.connected {
            self.send_to(id, msg.clone());
        }
    }

    /// Queues `msg` for every connected player except `excluded`.
    pub(crate) fn broadcast_except(&self, excluded: PlayerId, msg: &Message) {
        for &id in &self.connected {
            if id != excluded {
                self.send_to(id, msg.clone());
            }
        }
    }
}

/// Spawns the writer task for one player.
///
/// The task ends when the outbox closes, which happens when the player
/// entry is dropped on removal; it then closes the connection. It also
/// ends on the first failed send, after reporting the player for
/// eviction.
pub(crate) fn spawn_writer<C, K>(
    id: PlayerId,
    conn: Arc<C>,
    codec: Arc<K>,
    mut outbox: mpsc::Receiver<Message>,
    evictions: EvictionSender,
) where
    C: Connection,
    K: Codec,
{
    tokio::spawn(async move {
        while let Some(msg) = outbox.recv().await {
            match deliver(conn.as_ref(), codec.as_ref(), &msg).await {
                Ok(()) => {}
                Err(SessionError::Protocol(e)) => {
                    tracing::warn!(player_id = %id, error = %e, "dropping unencodable message");
                }
                Err(e) => {
                    tracing::debug!(player_id = %id, error = %e, "send failed, evicting");
                    let _ = evictions.send(id);
                    return;
                }
            }
        }
        if let Err(e) = conn.close().await {
            tracing::trace!(player_id = %id, error = %e, "close after removal failed");
        }
    });
}

async fn deliver<C: Connection, K: Codec>(
    conn: &C,
    codec: &K,
    msg: &Message,
) -> Result<(), SessionError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}
