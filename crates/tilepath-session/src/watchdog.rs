//! Turn timeout watchdog.
//!
//! Each turn gets one watchdog task bound to that turn's stamp. It waits
//! on a [`TurnTimer`]; if the turn changes first it exits, otherwise it
//! makes a move for the idle player. The move goes through
//! [`SessionState::apply_move`] like any client move, and only inside a
//! critical section that first checks the stamp is still current.

use rand::Rng;
use tilepath_board::Board;
use tilepath_protocol::{
    Codec, Move, MoveToken, PATH_POINTS, PlaceTile, PlayerId, ROTATIONS,
};
use tilepath_tick::{TimerOutcome, TurnTimer};
use tilepath_transport::Connection;

use crate::state::{Progress, SessionState, TurnStamp};
use crate::{Session, TurnPhase};

/// Random candidates tried before falling back to enumeration.
const RANDOM_ATTEMPTS: usize = 64;

impl<B: Board, C> SessionState<B, C> {
    /// Finds and applies a legal move for `player`.
    ///
    /// Samples random candidates first, then walks every possible move in
    /// order. A player with no legal move at all is eliminated so the
    /// round can go on.
    pub(crate) fn force_move(&mut self, player: PlayerId) -> Progress {
        if let Some(p) = self.players.get_mut(&player) {
            p.forced_play = true;
        }

        for _ in 0..RANDOM_ATTEMPTS {
            let Some(mv) = self.random_candidate(player) else {
                break;
            };
            if let Some(progress) = self.apply_move(mv) {
                return progress;
            }
        }
        for mv in self.all_candidates(player) {
            if let Some(progress) = self.apply_move(mv) {
                return progress;
            }
        }

        tracing::warn!(player_id = %player, "no legal move, eliminating stalled player");
        self.eliminate(player);
        self.advance_from(player)
    }

    fn random_candidate(&mut self, player: PlayerId) -> Option<Move> {
        let p = self.players.get(&player)?;
        match p.turn_phase() {
            TurnPhase::AwaitingStartPosition => {
                let (x, y) = p.last_placement?;
                Some(Move::MoveToken(MoveToken {
                    player_id: player,
                    x,
                    y,
                    position: self.rng.random_range(0..PATH_POINTS),
                }))
            }
            TurnPhase::AwaitingPlacement => {
                if p.hand.is_empty() {
                    return None;
                }
                let tile_id = p.hand[self.rng.random_range(0..p.hand.len())];
                let size = self.board.size();
                Some(Move::PlaceTile(PlaceTile {
                    player_id: player,
                    tile_id,
                    rotation: self.rng.random_range(0..ROTATIONS),
                    x: self.rng.random_range(0..size),
                    y: self.rng.random_range(0..size),
                }))
            }
        }
    }

    fn all_candidates(&self, player: PlayerId) -> Vec<Move> {
        let Some(p) = self.players.get(&player) else {
            return Vec::new();
        };
        match p.turn_phase() {
            TurnPhase::AwaitingStartPosition => {
                let Some((x, y)) = p.last_placement else {
                    return Vec::new();
                };
                (0..PATH_POINTS)
                    .map(|position| {
                        Move::MoveToken(MoveToken {
                            player_id: player,
                            x,
                            y,
                            position,
                        })
                    })
                    .collect()
            }
            TurnPhase::AwaitingPlacement => {
                let size = self.board.size();
                let mut tiles = p.hand.clone();
                tiles.sort_unstable();
                tiles.dedup();
                let mut moves = Vec::new();
                for y in 0..size {
                    for x in 0..size {
                        for &tile_id in &tiles {
                            for rotation in 0..ROTATIONS {
                                moves.push(Move::PlaceTile(PlaceTile {
                                    player_id: player,
                                    tile_id,
                                    rotation,
                                    x,
                                    y,
                                }));
                            }
                        }
                    }
                }
                moves
            }
        }
    }
}

impl<B, C, K> Session<B, C, K>
where
    B: Board,
    C: Connection,
    K: Codec,
{
    pub(crate) fn spawn_watchdog(&self, stamp: TurnStamp) {
        let session = self.clone();
        let timer = TurnTimer::new(self.inner.config.turn_time_limit);
        tokio::spawn(async move {
            let mut turns = session.inner.turns.clone();
            match timer.run(&mut turns, &stamp.turn).await {
                TimerOutcome::Expired { waited } => {
                    tracing::info!(
                        player_id = %stamp.player,
                        ?waited,
                        "turn timed out, forcing a move"
                    );
                    session.force_move(stamp).await;
                }
                TimerOutcome::Superseded => {
                    tracing::trace!(
                        player_id = %stamp.player,
                        turn = stamp.turn,
                        "watchdog stood down"
                    );
                }
            }
        });
    }

    /// Forces a move for the player on `stamp`'s turn, unless that turn is
    /// already over.
    pub(crate) async fn force_move(&self, stamp: TurnStamp) {
        let progress = {
            let mut state = self.inner.state.lock().await;
            if !state.is_current(stamp) {
                tracing::debug!(player_id = %stamp.player, "discarding stale forced move");
                return;
            }
            state.force_move(stamp.player)
        };
        self.after(Some(progress));
    }
}
