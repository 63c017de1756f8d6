//! Round configuration and the phase machines.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoundConfig
// ---------------------------------------------------------------------------

/// Settings that shape every round the session runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Connected players needed to start a round, and the most that are
    /// picked into one.
    pub player_limit: usize,

    /// Tiles dealt to each player at setup. Every placement is followed by
    /// one replacement draw, so the hand stays this size.
    pub hand_size: usize,

    /// How long the active player may idle before a move is forced.
    pub turn_time_limit: Duration,

    /// Force a move for players who exceed the turn limit.
    pub auto_play: bool,

    /// Start the next round automatically after a round ends.
    pub auto_restart: bool,

    /// Pause between the end of one round and looking for the next.
    pub restart_delay: Duration,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            player_limit: 4,
            hand_size: 4,
            turn_time_limit: Duration::from_secs(10),
            auto_play: true,
            auto_restart: true,
            restart_delay: Duration::from_secs(3),
        }
    }
}

impl RoundConfig {
    /// Smallest round that can have a winner.
    pub const MIN_PLAYERS: usize = 2;

    /// Clamps out-of-range values so the config is safe to run.
    ///
    /// - `player_limit` raised to [`Self::MIN_PLAYERS`].
    /// - `hand_size` raised to 1: a player with no tiles can never place.
    pub fn validated(mut self) -> Self {
        if self.player_limit < Self::MIN_PLAYERS {
            tracing::warn!(
                player_limit = self.player_limit,
                min = Self::MIN_PLAYERS,
                "player limit too small, clamping"
            );
            self.player_limit = Self::MIN_PLAYERS;
        }
        if self.hand_size == 0 {
            tracing::warn!("hand size of 0, clamping to 1");
            self.hand_size = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// RoundPhase
// ---------------------------------------------------------------------------

/// Where the session is in its round cycle.
///
/// ```text
/// WaitingForPlayers → RoundSetup → RoundInProgress → RoundOver
///        ▲                                               │
///        └───────────────── (auto-restart) ──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    WaitingForPlayers,
    RoundSetup,
    RoundInProgress,
    RoundOver,
}

impl RoundPhase {
    /// Returns `true` while turns are being played.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::RoundInProgress)
    }

    /// The only phase this one may move to.
    pub fn next(self) -> Self {
        match self {
            Self::WaitingForPlayers => Self::RoundSetup,
            Self::RoundSetup => Self::RoundInProgress,
            Self::RoundInProgress => Self::RoundOver,
            Self::RoundOver => Self::WaitingForPlayers,
        }
    }

    /// Returns `true` if moving to `target` follows the cycle.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == target
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingForPlayers => write!(f, "WaitingForPlayers"),
            Self::RoundSetup => write!(f, "RoundSetup"),
            Self::RoundInProgress => write!(f, "RoundInProgress"),
            Self::RoundOver => write!(f, "RoundOver"),
        }
    }
}

// ---------------------------------------------------------------------------
// TurnPhase
// ---------------------------------------------------------------------------

/// Which kind of move the active player owes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Place a tile from the hand.
    AwaitingPlacement,
    /// Pick a start point on the tile placed last turn.
    AwaitingStartPosition,
}

impl TurnPhase {
    /// The second move of a round is the start-position pick; every other
    /// move is a placement.
    pub fn for_moves_played(moves_played: u32) -> Self {
        if moves_played == 1 {
            Self::AwaitingStartPosition
        } else {
            Self::AwaitingPlacement
        }
    }
}
