//! Connection registry: admission, late-joiner replay and removal.

use std::sync::Arc;

use tilepath_board::Board;
use tilepath_protocol::{Codec, Message, PlayerId};
use tilepath_transport::Connection;
use tokio::sync::mpsc;

use crate::Session;
use crate::dispatch::{OUTBOX_CAPACITY, PlayerSender, spawn_writer};
use crate::player::Player;
use crate::state::{Progress, SessionState};

impl<B: Board, C: Connection> SessionState<B, C> {
    /// Registers a new player and brings them up to date.
    pub(crate) fn admit(&mut self, id: PlayerId, conn: Arc<C>, outbox: PlayerSender) {
        let name = conn.peer_addr().to_string();
        self.players
            .insert(id, Player::new(id, name.clone(), conn, outbox));

        self.send_to(id, Message::Welcome { id });
        for &other in &self.connected {
            self.send_to(
                other,
                Message::PlayerJoined {
                    name: name.clone(),
                    id,
                },
            );
            if let Some(existing) = self.players.get(&other) {
                self.send_to(
                    id,
                    Message::PlayerJoined {
                        name: existing.name.clone(),
                        id: other,
                    },
                );
            }
        }

        self.connected.push(id);
        self.publish_connected();
        tracing::info!(
            player_id = %id,
            %name,
            connected = self.connected.len(),
            "player admitted"
        );

        if self.phase.is_in_progress() {
            self.replay_round(id);
        }
    }

    /// Sends a late joiner what the others have already seen this round.
    fn replay_round(&self, id: PlayerId) {
        for &rostered in &self.roster {
            self.send_to(id, Message::PlayerTurn { id: rostered });
        }
        for &rostered in &self.roster {
            if !self.live.contains(&rostered) {
                self.send_to(id, Message::PlayerEliminated { id: rostered });
            }
        }
        for msg in &self.turn_log {
            self.send_to(id, msg.clone());
        }
        if let Some(active) = self.active {
            self.send_to(id, Message::PlayerTurn { id: active });
        }
        tracing::debug!(player_id = %id, log_len = self.turn_log.len(), "replayed round");
    }

    /// Removes a player entirely. Safe to call any number of times.
    pub(crate) fn remove_player(&mut self, id: PlayerId) -> Option<Progress> {
        if !self.players.contains_key(&id) {
            tracing::trace!(player_id = %id, "already removed");
            return None;
        }

        if let Some(pos) = self.live.iter().position(|&live| live == id) {
            self.live.remove(pos);
            self.broadcast_except(id, &Message::PlayerEliminated { id });
            self.broadcast_except(id, &Message::PlayerLeft { id });
        }
        self.connected.retain(|&c| c != id);
        // Dropping the entry closes the outbox, and the writer task then
        // closes the connection.
        self.players.remove(&id);
        self.publish_connected();
        tracing::info!(
            player_id = %id,
            connected = self.connected.len(),
            "player removed"
        );

        if !self.phase.is_in_progress() {
            return None;
        }
        if self.active == Some(id) {
            return Some(self.advance_from(id));
        }
        if self.live.len() <= 1 {
            return Some(self.end_round());
        }
        None
    }
}

impl<B, C, K> Session<B, C, K>
where
    B: Board,
    C: Connection,
    K: Codec,
{
    /// Admits a new connection and returns the id it was given.
    ///
    /// The player is welcomed, introduced to everyone connected, and, if
    /// a round is under way, sent enough history to follow it.
    pub async fn admit(&self, conn: C) -> PlayerId {
        let conn = Arc::new(conn);
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);

        let mut state = self.inner.state.lock().await;
        let id = state.allocate_id();
        spawn_writer(
            id,
            Arc::clone(&conn),
            Arc::clone(&self.inner.codec),
            rx,
            state.evictions.clone(),
        );
        state.admit(id, conn, tx);
        id
    }

    /// Removes a player, advancing the turn if it was theirs.
    ///
    /// Idempotent: a second call for the same id does nothing.
    pub async fn remove_player(&self, id: PlayerId) {
        let progress = {
            let mut state = self.inner.state.lock().await;
            state.remove_player(id)
        };
        self.after(progress);
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use tilepath_protocol::{Message, PlayerId};

    #[test]
    fn test_ids_start_at_zero_and_increase() {
        let mut h = Harness::new(4);
        let a = h.connect();
        let b = h.connect();
        let c = h.connect();
        assert_eq!(a, PlayerId(0));
        assert!(a < b && b < c);
    }

    #[test]
    fn test_admission_welcomes_and_introduces() {
        let mut h = Harness::new(4);
        let a = h.connect();
        assert_eq!(h.drain(a), vec![Message::Welcome { id: a }]);

        let b = h.connect();
        let to_a = h.drain(a);
        assert_eq!(
            to_a,
            vec![Message::PlayerJoined {
                name: peer_name(b),
                id: b
            }]
        );
        let to_b = h.drain(b);
        assert_eq!(
            to_b,
            vec![
                Message::Welcome { id: b },
                Message::PlayerJoined {
                    name: peer_name(a),
                    id: a
                },
            ]
        );
        assert_eq!(h.state.connected, vec![a, b]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut h = Harness::new(4);
        let a = h.connect();
        let b = h.connect();
        h.drain_all();

        assert_eq!(h.state.remove_player(a), None);
        assert_eq!(h.state.connected, vec![b]);
        // Not in a round, so nobody is told.
        assert!(h.drain(b).is_empty());

        assert_eq!(h.state.remove_player(a), None);
        assert_eq!(h.state.connected, vec![b]);
        assert!(h.drain(b).is_empty());
    }

    #[test]
    fn test_removing_live_player_notifies_others() {
        let mut h = Harness::new(3);
        let ids = h.start_round_with(3);
        let roster = h.state.roster.clone();
        h.drain_all();

        // Remove someone who is not on turn.
        let leaver = roster[2];
        assert_eq!(h.state.remove_player(leaver), None);
        for &id in &ids {
            if id == leaver {
                continue;
            }
            assert_eq!(
                h.drain(id),
                vec![
                    Message::PlayerEliminated { id: leaver },
                    Message::PlayerLeft { id: leaver },
                ]
            );
        }
        assert!(!h.state.live.contains(&leaver));
        assert_eq!(h.state.active, Some(roster[0]));
    }

    #[test]
    fn test_removing_active_player_advances_exactly_once() {
        let mut h = Harness::new(3);
        h.start_round_with(3);
        let roster = h.state.roster.clone();
        let turn = h.state.turn;
        h.drain_all();

        let progress = h.state.remove_player(roster[0]);
        assert!(matches!(progress, Some(crate::state::Progress::Turn(s)) if s.player == roster[1]));
        assert_eq!(h.state.turn, turn + 1);
        assert_eq!(h.state.active, Some(roster[1]));

        assert_eq!(h.state.remove_player(roster[0]), None);
        assert_eq!(h.state.turn, turn + 1);

        let turns: Vec<_> = h
            .drain(roster[1])
            .into_iter()
            .filter(|m| matches!(m, Message::PlayerTurn { .. }))
            .collect();
        assert_eq!(turns, vec![Message::PlayerTurn { id: roster[1] }]);
    }

    #[test]
    fn test_removal_leaving_one_player_ends_round() {
        let mut h = Harness::new(2);
        h.start_round_with(2);
        let roster = h.state.roster.clone();

        // The player not on turn leaves.
        let progress = h.state.remove_player(roster[1]);
        assert_eq!(progress, Some(crate::state::Progress::RoundOver));
        assert_eq!(h.state.phase, crate::RoundPhase::RoundOver);
        assert_eq!(h.state.active, None);
    }

    #[test]
    fn test_late_joiner_gets_replay() {
        let mut h = Harness::new(2);
        h.start_round_with(2);
        let roster = h.state.roster.clone();
        let first = roster[0];
        let hand = h.state.players[&first].hand.clone();
        assert!(h.place(first, hand[0], 0, 0).is_some());
        let log = h.state.turn_log.clone();
        assert!(!log.is_empty());

        let late = h.connect();
        let got = h.drain(late);

        let mut expected = vec![Message::Welcome { id: late }];
        for &id in &h.state.connected {
            if id != late {
                expected.push(Message::PlayerJoined {
                    name: peer_name(id),
                    id,
                });
            }
        }
        for &id in &roster {
            expected.push(Message::PlayerTurn { id });
        }
        expected.extend(log);
        expected.push(Message::PlayerTurn { id: roster[1] });
        assert_eq!(got, expected);

        // Spectators are never in the live set.
        assert!(!h.state.live.contains(&late));
    }
}
