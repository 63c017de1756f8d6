//! Shared doubles for the session integration tests: an in-memory
//! connection with a scriptable client end, and a board whose verdicts
//! the test controls.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tilepath_board::{Board, Movement};
use tilepath_protocol::{
    Codec, JsonCodec, Message, MoveToken, PathPoint, PlaceTile, PlayerId, Rotation, TileId,
};
use tilepath_session::{RoundConfig, Session};
use tilepath_transport::{Connection, ConnectionId, TransportError};
use tokio::sync::{Mutex, mpsc};

// =========================================================================
// In-memory connection
// =========================================================================

pub struct MemConnection {
    id: ConnectionId,
    peer: SocketAddr,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl Connection for MemConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        self.outbound.send(data.to_vec()).map_err(|_| {
            TransportError::SendFailed(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.inbound.lock().await.recv().await)
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

/// The client end of a [`MemConnection`].
pub struct MemClient {
    pub id: PlayerId,
    to_server: Option<mpsc::UnboundedSender<Vec<u8>>>,
    from_server: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
    buf: Vec<u8>,
    pub hand: Vec<TileId>,
}

pub fn pair(port: u16) -> (MemConnection, MemClient) {
    let (to_server, inbound) = mpsc::unbounded_channel();
    let (outbound, from_server) = mpsc::unbounded_channel();
    let conn = MemConnection {
        id: ConnectionId::new(u64::from(port)),
        peer: SocketAddr::from(([127, 0, 0, 1], port)),
        inbound: Mutex::new(inbound),
        outbound,
    };
    let client = MemClient {
        id: PlayerId(u64::MAX),
        to_server: Some(to_server),
        from_server: Some(from_server),
        buf: Vec::new(),
        hand: Vec::new(),
    };
    (conn, client)
}

impl MemClient {
    pub fn send(&self, msg: &Message) {
        self.send_raw(JsonCodec.encode(msg).unwrap());
    }

    pub fn send_raw(&self, bytes: Vec<u8>) {
        if let Some(tx) = &self.to_server {
            let _ = tx.send(bytes);
        }
    }

    pub fn place(&self, tile_id: TileId, rotation: Rotation, x: u8, y: u8) {
        self.send(&Message::PlaceTile(PlaceTile {
            player_id: self.id,
            tile_id,
            rotation,
            x,
            y,
        }));
    }

    pub fn start(&self, x: u8, y: u8, position: PathPoint) {
        self.send(&Message::MoveToken(MoveToken {
            player_id: self.id,
            x,
            y,
            position,
        }));
    }

    /// Closes the client's sending side; the server reads end-of-stream.
    pub fn hang_up(&mut self) {
        self.to_server = None;
    }

    /// Stops reading; the server's next send to this client fails.
    pub fn stop_reading(&mut self) {
        self.from_server = None;
    }

    fn decode_buffered(&mut self) -> Option<Message> {
        let (msg, consumed) = JsonCodec.decode_one::<Message>(&self.buf).unwrap()?;
        self.buf.drain(..consumed);
        if let Message::AddTileToHand { tile_id } = msg {
            self.hand.push(tile_id);
        }
        Some(msg)
    }

    /// Waits for the next message from the server.
    pub async fn next(&mut self) -> Message {
        loop {
            if let Some(msg) = self.decode_buffered() {
                return msg;
            }
            let rx = self.from_server.as_mut().expect("client stopped reading");
            let chunk = tokio::time::timeout(Duration::from_secs(120), rx.recv())
                .await
                .expect("timed out waiting for the server")
                .expect("server closed the connection");
            self.buf.extend_from_slice(&chunk);
        }
    }

    /// Skips messages until one matches.
    pub async fn next_matching(&mut self, pred: impl Fn(&Message) -> bool) -> Message {
        loop {
            let msg = self.next().await;
            if pred(&msg) {
                return msg;
            }
        }
    }

    /// Everything the server has sent so far, without waiting.
    pub fn drain(&mut self) -> Vec<Message> {
        if let Some(rx) = self.from_server.as_mut() {
            while let Ok(chunk) = rx.try_recv() {
                self.buf.extend_from_slice(&chunk);
            }
        }
        let mut out = Vec::new();
        while let Some(msg) = self.decode_buffered() {
            out.push(msg);
        }
        out
    }

    /// Removes a played tile from the tracked hand.
    pub fn played(&mut self, tile_id: TileId) {
        if let Some(pos) = self.hand.iter().position(|&t| t == tile_id) {
            self.hand.remove(pos);
        }
    }
}

// =========================================================================
// Scripted board
// =========================================================================

#[derive(Default)]
pub struct Script {
    pub placed: HashSet<(u8, u8)>,
    pub starts: HashSet<PlayerId>,
    pub movements: VecDeque<Movement>,
    pub reject_all: bool,
    pub resets: usize,
}

/// A board that accepts any placement on a free square and whose movement
/// results come from a queue the test fills.
#[derive(Clone, Default)]
pub struct ScriptedBoard {
    pub script: Arc<StdMutex<Script>>,
}

impl ScriptedBoard {
    pub fn push_movement(&self, movement: Movement) {
        self.script.lock().unwrap().movements.push_back(movement);
    }

    pub fn resets(&self) -> usize {
        self.script.lock().unwrap().resets
    }

    pub fn placed_count(&self) -> usize {
        self.script.lock().unwrap().placed.len()
    }
}

impl Board for ScriptedBoard {
    fn size(&self) -> u8 {
        5
    }

    fn tile_kinds(&self) -> TileId {
        35
    }

    fn place_tile(
        &mut self,
        x: u8,
        y: u8,
        tile: TileId,
        rotation: Rotation,
        _player: PlayerId,
    ) -> bool {
        let mut s = self.script.lock().unwrap();
        if s.reject_all || x >= 5 || y >= 5 || tile >= 35 || rotation >= 4 {
            return false;
        }
        s.placed.insert((x, y))
    }

    fn set_start_position(
        &mut self,
        player: PlayerId,
        _x: u8,
        _y: u8,
        position: PathPoint,
    ) -> bool {
        let mut s = self.script.lock().unwrap();
        !s.reject_all && position < 8 && s.starts.insert(player)
    }

    fn has_start_position(&self, player: PlayerId) -> bool {
        self.script.lock().unwrap().starts.contains(&player)
    }

    fn resolve_movement(&mut self, _live: &[PlayerId]) -> Movement {
        self.script
            .lock()
            .unwrap()
            .movements
            .pop_front()
            .unwrap_or_default()
    }

    fn reset(&mut self) {
        let mut s = self.script.lock().unwrap();
        s.placed.clear();
        s.starts.clear();
        s.resets += 1;
    }
}

// =========================================================================
// Helpers
// =========================================================================

pub type TestSession = Session<ScriptedBoard, MemConnection>;

pub fn config(player_limit: usize) -> RoundConfig {
    RoundConfig {
        player_limit,
        auto_play: false,
        auto_restart: false,
        ..Default::default()
    }
}

pub fn session(config: RoundConfig) -> (TestSession, ScriptedBoard) {
    let board = ScriptedBoard::default();
    let session = Session::with_seed(config, board.clone(), JsonCodec, 11);
    (session, board)
}

/// Admits a new in-memory client and reads its welcome.
pub async fn join(session: &TestSession, port: u16) -> MemClient {
    let (conn, mut client) = pair(port);
    let id = session.admit(conn).await;
    client.id = id;
    assert_eq!(client.next().await, Message::Welcome { id });
    client
}

/// Lets spawned tasks run without moving the paused clock far.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Reads `client` up to the first turn notice and returns whose it is.
pub async fn first_turn(client: &mut MemClient) -> PlayerId {
    match client
        .next_matching(|m| matches!(m, Message::PlayerTurn { .. }))
        .await
    {
        Message::PlayerTurn { id } => id,
        _ => unreachable!(),
    }
}

pub fn by_id(clients: &mut [MemClient], id: PlayerId) -> &mut MemClient {
    clients
        .iter_mut()
        .find(|c| c.id == id)
        .expect("no client with that id")
}
