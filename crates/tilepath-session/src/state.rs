//! The shared session model.
//!
//! [`SessionState`] is plain synchronous data. It lives behind the one
//! mutex in [`crate::Session`], and every method here runs with that lock
//! held, so a method is one atomic step of the game. Methods never await
//! and never remove a player on a failed send; failures are reported on
//! the eviction channel and handled by another task.

use std::collections::{HashMap, VecDeque};

use rand::Rng;
use rand::rngs::StdRng;
use tilepath_board::Board;
use tilepath_protocol::{Message, PlayerId, TileId};
use tokio::sync::{mpsc, watch};

use crate::player::Player;
use crate::{RoundConfig, RoundPhase};

/// Identifies one turn: who is on it and which turn it is.
///
/// The turn counter increases on every turn change and on every round
/// end, so a stamp is current only while nothing has happened since it
/// was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnStamp {
    pub player: PlayerId,
    pub turn: u64,
}

/// What a state change did to the turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    /// A new turn started.
    Turn(TurnStamp),
    /// The round ended instead of starting another turn.
    RoundOver,
}

/// Read-only view of the session, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: RoundPhase,
    /// Connected ids in admission order.
    pub connected: Vec<PlayerId>,
    /// Rotation queue; the head is on turn.
    pub live: Vec<PlayerId>,
    pub roster: Vec<PlayerId>,
    pub active: Option<PlayerId>,
    pub turn: u64,
    pub log_len: usize,
}

pub(crate) type EvictionSender = mpsc::UnboundedSender<PlayerId>;

pub(crate) struct SessionState<B, C> {
    pub(crate) config: RoundConfig,
    pub(crate) players: HashMap<PlayerId, Player<C>>,
    /// Broadcast order.
    pub(crate) connected: Vec<PlayerId>,
    pub(crate) live: VecDeque<PlayerId>,
    pub(crate) roster: Vec<PlayerId>,
    pub(crate) active: Option<PlayerId>,
    pub(crate) phase: RoundPhase,
    pub(crate) turn_log: Vec<Message>,
    pub(crate) board: B,
    pub(crate) turn: u64,
    next_id: u64,
    pub(crate) rng: StdRng,
    pub(crate) evictions: EvictionSender,
    turn_tx: watch::Sender<u64>,
    connected_tx: watch::Sender<usize>,
}

impl<B: Board, C> SessionState<B, C> {
    pub(crate) fn new(
        config: RoundConfig,
        board: B,
        rng: StdRng,
        evictions: EvictionSender,
    ) -> Self {
        Self {
            config,
            players: HashMap::new(),
            connected: Vec::new(),
            live: VecDeque::new(),
            roster: Vec::new(),
            active: None,
            phase: RoundPhase::WaitingForPlayers,
            turn_log: Vec::new(),
            board,
            turn: 0,
            next_id: 0,
            rng,
            evictions,
            turn_tx: watch::Sender::new(0),
            connected_tx: watch::Sender::new(0),
        }
    }

    /// Receiver that sees the turn counter change.
    pub(crate) fn subscribe_turns(&self) -> watch::Receiver<u64> {
        self.turn_tx.subscribe()
    }

    /// Receiver that sees the connected count change.
    pub(crate) fn subscribe_connected(&self) -> watch::Receiver<usize> {
        self.connected_tx.subscribe()
    }

    pub(crate) fn allocate_id(&mut self) -> PlayerId {
        let id = PlayerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn publish_connected(&self) {
        self.connected_tx.send_replace(self.connected.len());
    }

    pub(crate) fn set_phase(&mut self, next: RoundPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "phase {} cannot move to {next}",
            self.phase
        );
        tracing::info!(from = %self.phase, to = %next, "round phase");
        self.phase = next;
    }

    /// Returns `true` if nothing has changed since `stamp` was taken.
    pub(crate) fn is_current(&self, stamp: TurnStamp) -> bool {
        self.phase.is_in_progress()
            && self.turn == stamp.turn
            && self.active == Some(stamp.player)
    }

    pub(crate) fn current_stamp(&self) -> Option<TurnStamp> {
        if !self.phase.is_in_progress() {
            return None;
        }
        self.active.map(|player| TurnStamp {
            player,
            turn: self.turn,
        })
    }

    pub(crate) fn draw_tile(&mut self) -> TileId {
        self.rng.random_range(0..self.board.tile_kinds())
    }

    /// Hands the turn on after `actor` acted or left.
    ///
    /// A surviving actor goes to the back of the queue; the head is the
    /// next player on turn. Ends the round instead if at most one player
    /// is left.
    pub(crate) fn advance_from(&mut self, actor: PlayerId) -> Progress {
        if self.live.len() <= 1 {
            return self.end_round();
        }
        if let Some(pos) = self.live.iter().position(|&id| id == actor) {
            self.live.remove(pos);
            self.live.push_back(actor);
        }
        let Some(&next) = self.live.front() else {
            return self.end_round();
        };
        self.begin_turn(next)
    }

    /// Puts `player` on turn and announces it.
    pub(crate) fn begin_turn(&mut self, player: PlayerId) -> Progress {
        self.active = Some(player);
        self.turn += 1;
        self.broadcast(&Message::PlayerTurn { id: player });
        self.turn_tx.send_replace(self.turn);
        tracing::debug!(%player, turn = self.turn, "turn started");
        Progress::Turn(TurnStamp {
            player,
            turn: self.turn,
        })
    }

    pub(crate) fn end_round(&mut self) -> Progress {
        self.set_phase(RoundPhase::RoundOver);
        self.active = None;
        self.turn += 1;
        self.turn_tx.send_replace(self.turn);
        Progress::RoundOver
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            connected: self.connected.clone(),
            live: self.live.iter().copied().collect(),
            roster: self.roster.clone(),
            active: self.active,
            turn: self.turn,
            log_len: self.turn_log.len(),
        }
    }
}
