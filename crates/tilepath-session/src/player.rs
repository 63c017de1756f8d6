//! Per-player bookkeeping.

use std::sync::Arc;

use tilepath_protocol::{PlayerId, TileId};

use crate::TurnPhase;
use crate::dispatch::PlayerSender;

/// One connected player, spectating or playing.
pub(crate) struct Player<C> {
    pub(crate) id: PlayerId,
    /// `host:port` of the peer.
    pub(crate) name: String,
    /// Read only by the turn engine, written only by the writer task.
    pub(crate) conn: Arc<C>,
    pub(crate) outbox: PlayerSender,
    pub(crate) hand: Vec<TileId>,
    pub(crate) moves_played: u32,
    /// Square of the last tile this player placed this round.
    pub(crate) last_placement: Option<(u8, u8)>,
    /// Set while the watchdog is searching for a move on this player's
    /// behalf.
    pub(crate) forced_play: bool,
    /// Bytes read from the connection that do not yet make a whole
    /// frame. Survives round resets; dropped with the player.
    pub(crate) recv_buf: Vec<u8>,
}

impl<C> Player<C> {
    pub(crate) fn new(id: PlayerId, name: String, conn: Arc<C>, outbox: PlayerSender) -> Self {
        Self {
            id,
            name,
            conn,
            outbox,
            hand: Vec::new(),
            moves_played: 0,
            last_placement: None,
            forced_play: false,
            recv_buf: Vec::new(),
        }
    }

    pub(crate) fn turn_phase(&self) -> TurnPhase {
        TurnPhase::for_moves_played(self.moves_played)
    }

    /// Clears everything scoped to a round. The receive buffer belongs
    /// to the connection and is kept.
    pub(crate) fn reset_round(&mut self) {
        self.hand.clear();
        self.moves_played = 0;
        self.last_placement = None;
        self.forced_play = false;
    }

    pub(crate) fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            hand: self.hand.clone(),
            moves_played: self.moves_played,
            last_placement: self.last_placement,
        }
    }
}

/// Read-only copy of a player's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub hand: Vec<TileId>,
    pub moves_played: u32,
    pub last_placement: Option<(u8, u8)>,
}
