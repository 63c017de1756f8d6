//! Round lifecycle: wait for players, set up, play, reset, restart.

use rand::seq::SliceRandom;
use tilepath_board::Board;
use tilepath_protocol::{Codec, Message};
use tilepath_transport::Connection;

use crate::state::{Progress, SessionState};
use crate::{RoundPhase, Session};

impl<B: Board, C> SessionState<B, C> {
    pub(crate) fn ready_to_start(&self) -> bool {
        self.phase == RoundPhase::WaitingForPlayers
            && self.connected.len() >= self.config.player_limit
    }

    /// Announces the round, picks the roster, deals and starts the first
    /// turn, all in one step.
    pub(crate) fn start_round(&mut self) -> Progress {
        self.broadcast(&Message::Countdown);
        self.set_phase(RoundPhase::RoundSetup);

        let mut picked = self.connected.clone();
        picked.shuffle(&mut self.rng);
        picked.truncate(self.config.player_limit);
        self.roster = picked.clone();
        self.live = picked.into();
        self.turn_log.clear();
        tracing::info!(roster = ?self.roster, "round setup");

        // Everyone connected sees the start, picked or not.
        self.broadcast(&Message::GameStart);
        let roster = self.roster.clone();
        for id in roster {
            for _ in 0..self.config.hand_size {
                let tile_id = self.draw_tile();
                if let Some(player) = self.players.get_mut(&id) {
                    player.hand.push(tile_id);
                }
                self.send_to(id, Message::AddTileToHand { tile_id });
            }
        }

        self.set_phase(RoundPhase::RoundInProgress);
        match self.live.front().copied() {
            Some(first) => self.begin_turn(first),
            None => self.end_round(),
        }
    }

    /// Tears down everything scoped to the round that just ended.
    pub(crate) fn finish_round(&mut self) {
        tracing::info!(
            winner = ?self.live.front(),
            moves = self.turn_log.len(),
            "game over"
        );
        for id in &self.roster {
            if let Some(player) = self.players.get_mut(id) {
                player.reset_round();
            }
        }
        self.live.clear();
        self.roster.clear();
        self.turn_log.clear();
        self.active = None;
        self.board.reset();
    }
}

impl<B, C, K> Session<B, C, K>
where
    B: Board,
    C: Connection,
    K: Codec,
{
    /// Runs rounds until one ends with auto-restart off. With auto-restart
    /// on, never returns.
    pub async fn run(&self) {
        loop {
            let progress = loop {
                self.wait_for_players().await;
                let mut state = self.inner.state.lock().await;
                // Someone may have left between the signal and the lock.
                if state.ready_to_start() {
                    break state.start_round();
                }
            };
            self.after(Some(progress));

            self.play_round().await;
            self.inner.state.lock().await.finish_round();

            if !self.inner.config.auto_restart {
                tracing::info!("auto-restart disabled, no further rounds");
                return;
            }
            tokio::time::sleep(self.inner.config.restart_delay).await;
            self.inner
                .state
                .lock()
                .await
                .set_phase(RoundPhase::WaitingForPlayers);
        }
    }

    async fn wait_for_players(&self) {
        let limit = self.inner.config.player_limit;
        let mut connected = self.inner.connected.clone();
        // The sender lives in the state this session owns, so the wait
        // cannot fail while `self` is alive.
        let _ = connected.wait_for(|&n| n >= limit).await;
    }
}
