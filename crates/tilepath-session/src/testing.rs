//! Test doubles for driving [`SessionState`] synchronously.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tilepath_board::{Board, Movement};
use tilepath_protocol::{
    Message, Move, MoveToken, PathPoint, PlaceTile, PlayerId, Rotation, TileId,
};
use tilepath_transport::{Connection, ConnectionId, TransportError};
use tokio::sync::mpsc;

use crate::RoundConfig;
use crate::dispatch::OUTBOX_CAPACITY;
use crate::state::{Progress, SessionState};

pub(crate) const TILE_KINDS: TileId = 35;

/// A connection that is never read or written in sync tests.
pub(crate) struct NullConnection {
    id: ConnectionId,
    peer: SocketAddr,
}

impl Connection for NullConnection {
    async fn send(&self, _data: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

/// Frames sent to a [`RecordingConnection`], shared with the test.
pub(crate) type Sent = Arc<StdMutex<Vec<Vec<u8>>>>;

/// A connection that keeps everything sent to it and never has anything
/// to read.
pub(crate) struct RecordingConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sent: Sent,
}

impl RecordingConnection {
    pub(crate) fn new(port: u16) -> (Self, Sent) {
        let sent = Sent::default();
        let conn = Self {
            id: ConnectionId::new(u64::from(port)),
            peer: SocketAddr::from(([127, 0, 0, 1], port)),
            sent: Arc::clone(&sent),
        };
        (conn, sent)
    }
}

impl Connection for RecordingConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        std::future::pending().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

pub(crate) fn peer_name(id: PlayerId) -> String {
    format!("127.0.0.1:{}", 40_000 + id.0)
}

/// Accepts any placement on a free square of a 5×5 grid and any first
/// start position. Movement results are scripted.
#[derive(Default)]
pub(crate) struct OpenBoard {
    pub(crate) placed: HashSet<(u8, u8)>,
    pub(crate) starts: HashSet<PlayerId>,
    pub(crate) script: VecDeque<Movement>,
    pub(crate) reject_all: bool,
    pub(crate) only_square: Option<(u8, u8)>,
    pub(crate) resets: usize,
}

impl Board for OpenBoard {
    fn size(&self) -> u8 {
        5
    }

    fn tile_kinds(&self) -> TileId {
        TILE_KINDS
    }

    fn place_tile(
        &mut self,
        x: u8,
        y: u8,
        tile: TileId,
        rotation: Rotation,
        _player: PlayerId,
    ) -> bool {
        if self.reject_all || x >= 5 || y >= 5 || tile >= TILE_KINDS || rotation >= 4 {
            return false;
        }
        if self.only_square.is_some_and(|sq| sq != (x, y)) {
            return false;
        }
        self.placed.insert((x, y))
    }

    fn set_start_position(
        &mut self,
        player: PlayerId,
        _x: u8,
        _y: u8,
        position: PathPoint,
    ) -> bool {
        !self.reject_all && position < 8 && self.starts.insert(player)
    }

    fn has_start_position(&self, player: PlayerId) -> bool {
        self.starts.contains(&player)
    }

    fn resolve_movement(&mut self, _live: &[PlayerId]) -> Movement {
        self.script.pop_front().unwrap_or_default()
    }

    fn reset(&mut self) {
        self.placed.clear();
        self.starts.clear();
        self.resets += 1;
    }
}

/// A [`SessionState`] with captured outboxes.
pub(crate) struct Harness {
    pub(crate) state: SessionState<OpenBoard, NullConnection>,
    outboxes: HashMap<PlayerId, mpsc::Receiver<Message>>,
    history: HashMap<PlayerId, Vec<Message>>,
    evictions: mpsc::UnboundedReceiver<PlayerId>,
}

impl Harness {
    pub(crate) fn new(player_limit: usize) -> Self {
        let config = RoundConfig {
            player_limit,
            ..Default::default()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let rng = StdRng::seed_from_u64(7);
        Self {
            state: SessionState::new(config, OpenBoard::default(), rng, tx),
            outboxes: HashMap::new(),
            history: HashMap::new(),
            evictions: rx,
        }
    }

    pub(crate) fn connect(&mut self) -> PlayerId {
        self.connect_with_capacity(OUTBOX_CAPACITY)
    }

    /// Connects a player whose outbox holds at most `capacity` messages.
    pub(crate) fn connect_with_capacity(&mut self, capacity: usize) -> PlayerId {
        let id = self.state.allocate_id();
        let conn = NullConnection {
            id: ConnectionId::new(id.0),
            peer: peer_name(id).parse().unwrap(),
        };
        let (tx, rx) = mpsc::channel(capacity);
        self.outboxes.insert(id, rx);
        self.state.admit(id, Arc::new(conn), tx);
        id
    }

    /// Drops the receiving end of `id`'s outbox, as a dead writer would.
    pub(crate) fn hang_up_writer(&mut self, id: PlayerId) {
        self.outboxes.remove(&id);
    }

    /// Ids reported for eviction since the last call.
    pub(crate) fn evicted(&mut self) -> Vec<PlayerId> {
        let mut got = Vec::new();
        while let Ok(id) = self.evictions.try_recv() {
            got.push(id);
        }
        got
    }

    /// Connects `n` players and starts a round. Setup messages are left
    /// undrained.
    pub(crate) fn start_round_with(&mut self, n: usize) -> Vec<PlayerId> {
        let ids = (0..n).map(|_| self.connect()).collect();
        self.state.start_round();
        ids
    }

    /// Messages queued for `id` since the last drain.
    pub(crate) fn drain(&mut self, id: PlayerId) -> Vec<Message> {
        let mut got = Vec::new();
        if let Some(rx) = self.outboxes.get_mut(&id) {
            while let Ok(msg) = rx.try_recv() {
                got.push(msg);
            }
        }
        self.history.entry(id).or_default().extend(got.iter().cloned());
        got
    }

    pub(crate) fn drain_all(&mut self) {
        let ids: Vec<_> = self.outboxes.keys().copied().collect();
        for id in ids {
            self.drain(id);
        }
    }

    /// Everything ever queued for `id`.
    pub(crate) fn log_for(&mut self, id: PlayerId) -> Vec<Message> {
        self.drain(id);
        self.history.get(&id).cloned().unwrap_or_default()
    }

    pub(crate) fn place(
        &mut self,
        player: PlayerId,
        tile_id: TileId,
        x: u8,
        y: u8,
    ) -> Option<Progress> {
        self.state.apply_move(Move::PlaceTile(PlaceTile {
            player_id: player,
            tile_id,
            rotation: 0,
            x,
            y,
        }))
    }

    pub(crate) fn start(
        &mut self,
        player: PlayerId,
        x: u8,
        y: u8,
        position: PathPoint,
    ) -> Option<Progress> {
        self.state.apply_move(Move::MoveToken(MoveToken {
            player_id: player,
            x,
            y,
            position,
        }))
    }

    /// Plays whatever move `player` owes.
    pub(crate) fn play_any(&mut self, player: PlayerId) -> Option<Progress> {
        let p = &self.state.players[&player];
        if p.moves_played == 1 {
            let (x, y) = p.last_placement?;
            return self.start(player, x, y, 7);
        }
        let tile = *p.hand.first()?;
        let (x, y) = (0..5u8)
            .flat_map(|y| (0..5u8).map(move |x| (x, y)))
            .find(|sq| !self.state.board.placed.contains(sq))?;
        self.place(player, tile, x, y)
    }
}

pub(crate) fn place_msg(player: PlayerId, tile_id: TileId, x: u8, y: u8) -> Message {
    Message::PlaceTile(PlaceTile {
        player_id: player,
        tile_id,
        rotation: 0,
        x,
        y,
    })
}
