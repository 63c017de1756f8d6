//! Per-connection hand-off.
//!
//! Each accepted connection gets a short-lived Tokio task that registers
//! it with the session. After that the connection belongs to the session:
//! its writer task sends to it, and the turn engine reads from it while
//! the player is on turn.

use tilepath_board::Board;
use tilepath_protocol::Codec;
use tilepath_session::Session;
use tilepath_transport::Connection;

/// Spawns the registration task for one connection.
pub(crate) fn spawn_registration<B, C, K>(session: &Session<B, C, K>, conn: C)
where
    B: Board,
    C: Connection,
    K: Codec,
{
    let session = session.clone();
    tokio::spawn(async move {
        let conn_id = conn.id();
        let peer = conn.peer_addr();
        tracing::debug!(%conn_id, %peer, "registering connection");

        let player_id = session.admit(conn).await;
        tracing::debug!(%conn_id, %player_id, "connection registered");
    });
}
