//! The turn engine.
//!
//! One loop reads from exactly one connection at a time: the active
//! player's. Bytes go into a buffer that lives on the player entry, so a
//! partial frame left over from an earlier turn, or an earlier round, is
//! still there when that player is next on turn. Every decoded move is
//! validated and applied under the session lock, and only if the turn it
//! was read for is still current.

use std::sync::Arc;

use tilepath_board::Board;
use tilepath_protocol::{Codec, Message, Move, PlayerId, ProtocolError};
use tilepath_transport::Connection;
use tokio::sync::watch;

use crate::state::{Progress, SessionState, TurnStamp};
use crate::{Session, TurnPhase};

impl<B: Board, C> SessionState<B, C> {
    /// Validates `mv` and, if legal, applies all of its effects.
    ///
    /// Returns `None` when the move is rejected. Rejection is silent: the
    /// board is untouched and the same player stays on turn. Client moves
    /// and forced moves both come through here.
    pub(crate) fn apply_move(&mut self, mv: Move) -> Option<Progress> {
        let actor = mv.player_id();
        if !self.phase.is_in_progress() || self.active != Some(actor) {
            tracing::debug!(player_id = %actor, "move from player not on turn");
            return None;
        }
        let player = self.players.get(&actor)?;
        let accepted = match (mv, player.turn_phase()) {
            (Move::PlaceTile(m), TurnPhase::AwaitingPlacement) => {
                player.hand.contains(&m.tile_id)
                    && self
                        .board
                        .place_tile(m.x, m.y, m.tile_id, m.rotation, actor)
            }
            (Move::MoveToken(m), TurnPhase::AwaitingStartPosition) => {
                player.last_placement == Some((m.x, m.y))
                    && !self.board.has_start_position(actor)
                    && self
                        .board
                        .set_start_position(actor, m.x, m.y, m.position)
            }
            _ => false,
        };
        if !accepted {
            tracing::debug!(player_id = %actor, ?mv, "move rejected");
            return None;
        }

        let forced = self
            .players
            .get_mut(&actor)
            .map(|p| std::mem::take(&mut p.forced_play))
            .unwrap_or(false);
        tracing::debug!(player_id = %actor, ?mv, forced, turn = self.turn, "move accepted");

        let msg = Message::from(mv);
        self.broadcast(&msg);
        self.turn_log.push(msg);
        self.resolve_movement();

        // An actor eliminated by their own move was already reset.
        if self.live.contains(&actor) {
            if let Move::PlaceTile(m) = mv {
                let replacement = self.draw_tile();
                if let Some(player) = self.players.get_mut(&actor) {
                    player.last_placement = Some((m.x, m.y));
                    if let Some(pos) = player.hand.iter().position(|&t| t == m.tile_id) {
                        player.hand.remove(pos);
                    }
                    player.hand.push(replacement);
                }
                self.send_to(
                    actor,
                    Message::AddTileToHand {
                        tile_id: replacement,
                    },
                );
            }
            if let Some(player) = self.players.get_mut(&actor) {
                player.moves_played += 1;
            }
        }

        Some(self.advance_from(actor))
    }

    /// Lets the board move tokens, then announces and logs the results.
    fn resolve_movement(&mut self) {
        let live: Vec<PlayerId> = self.live.iter().copied().collect();
        let movement = self.board.resolve_movement(&live);
        for update in movement.updates {
            let msg = Message::MoveToken(update);
            self.broadcast(&msg);
            self.turn_log.push(msg);
        }
        for id in movement.eliminated {
            self.eliminate(id);
        }
    }

    /// Takes a player out of the round. They stay connected and watch.
    pub(crate) fn eliminate(&mut self, id: PlayerId) {
        let Some(pos) = self.live.iter().position(|&live| live == id) else {
            return;
        };
        self.live.remove(pos);
        if let Some(player) = self.players.get_mut(&id) {
            player.reset_round();
        }
        self.broadcast(&Message::PlayerEliminated { id });
        tracing::info!(player_id = %id, live = self.live.len(), "player eliminated");
    }
}

impl<B, C, K> Session<B, C, K>
where
    B: Board,
    C: Connection,
    K: Codec,
{
    /// Runs turns until the round is over.
    pub(crate) async fn play_round(&self) {
        let mut turns = self.inner.turns.clone();

        loop {
            let (stamp, conn, mut buf) = {
                let mut state = self.inner.state.lock().await;
                // Mark the current turn as seen while no one can change it.
                turns.borrow_and_update();
                let Some(stamp) = state.current_stamp() else {
                    return;
                };
                let Some(player) = state.players.get_mut(&stamp.player) else {
                    return;
                };
                let buf = std::mem::take(&mut player.recv_buf);
                (stamp, Arc::clone(&player.conn), buf)
            };

            let closed = self.read_turn(stamp, conn.as_ref(), &mut buf, &mut turns).await;
            self.stash_buffer(stamp.player, buf).await;
            if closed {
                return;
            }
        }
    }

    /// Reads the active player's connection until something happens on
    /// this turn. Returns `true` if the turn channel has closed.
    async fn read_turn(
        &self,
        stamp: TurnStamp,
        conn: &C,
        buf: &mut Vec<u8>,
        turns: &mut watch::Receiver<u64>,
    ) -> bool {
        if self.process_buffer(stamp, buf).await {
            return false;
        }

        tokio::select! {
            changed = turns.changed() => changed.is_err(),
            read = conn.recv() => {
                match read {
                    Ok(Some(chunk)) => {
                        tracing::trace!(
                            player_id = %stamp.player,
                            len = chunk.len(),
                            "bytes received"
                        );
                        buf.extend_from_slice(&chunk);
                        self.process_buffer(stamp, buf).await;
                    }
                    Ok(None) => {
                        tracing::debug!(player_id = %stamp.player, "connection closed");
                        self.remove_player(stamp.player).await;
                    }
                    Err(e) => {
                        tracing::debug!(player_id = %stamp.player, error = %e, "read failed");
                        self.remove_player(stamp.player).await;
                    }
                }
                false
            }
        }
    }

    /// Hands a buffer back to its player. A removed player's leftover
    /// bytes are dropped with them.
    async fn stash_buffer(&self, id: PlayerId, buf: Vec<u8>) {
        let mut state = self.inner.state.lock().await;
        if let Some(player) = state.players.get_mut(&id) {
            player.recv_buf = buf;
        }
    }

    /// Decodes and submits every complete frame in `buf`. Returns `true`
    /// once the turn has moved on.
    async fn process_buffer(&self, stamp: TurnStamp, buf: &mut Vec<u8>) -> bool {
        loop {
            match self.inner.codec.decode_one::<Message>(buf) {
                Ok(None) => return false,
                Ok(Some((msg, consumed))) => {
                    buf.drain(..consumed);
                    let Some(mv) = msg.into_move() else {
                        tracing::trace!(player_id = %stamp.player, "ignoring non-move message");
                        continue;
                    };
                    if self.submit(stamp, mv).await {
                        return true;
                    }
                }
                Err(ProtocolError::Malformed { consumed, source }) => {
                    tracing::debug!(
                        player_id = %stamp.player,
                        error = %source,
                        "skipping malformed frame"
                    );
                    buf.drain(..consumed);
                }
                Err(e) => {
                    tracing::warn!(
                        player_id = %stamp.player,
                        error = %e,
                        "unreadable stream, dropping player"
                    );
                    buf.clear();
                    self.remove_player(stamp.player).await;
                    return true;
                }
            }
        }
    }

    /// Applies a move read for `stamp`, if that turn is still current.
    async fn submit(&self, stamp: TurnStamp, mv: Move) -> bool {
        let progress = {
            let mut state = self.inner.state.lock().await;
            if !state.is_current(stamp) {
                return true;
            }
            state.apply_move(mv)
        };
        let moved_on = progress.is_some();
        self.after(progress);
        moved_on
    }
}
