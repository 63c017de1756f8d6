//! Message types for Tilepath's wire format.
//!
//! Every type in this module travels "on the wire": the server encodes
//! them with a [`Codec`](crate::Codec), sends the bytes over a player's
//! connection, and the client decodes them on the other side (and the
//! other way round for the two move kinds).

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity and board primitives
// ---------------------------------------------------------------------------

/// A unique identifier for a connected player.
///
/// Identities are handed out by the server in admission order and are
/// never reused, so a larger id always means a later connection.
///
/// `#[serde(transparent)]` makes `PlayerId(42)` serialize as plain `42`
/// instead of `{ "0": 42 }`, which is what clients expect.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

/// Display lets us use `{}` in format strings and logging.
/// `tracing::info!(%player_id, "joined")` prints "P-42".
impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifies a kind of tile (which pairs of edge points it connects).
pub type TileId = u16;

/// A tile's rotation in clockwise quarter turns, `0..ROTATIONS`.
pub type Rotation = u8;

/// One of the eight edge points of a square, `0..PATH_POINTS`.
///
/// Points are numbered clockwise from the top-left one: `0, 1` on the top
/// edge, `2, 3` on the right, `4, 5` on the bottom and `6, 7` on the left.
pub type PathPoint = u8;

/// Number of distinct tile rotations.
pub const ROTATIONS: Rotation = 4;

/// Number of edge points on a square.
pub const PATH_POINTS: PathPoint = 8;

// ---------------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------------

/// "Player `player_id` puts tile `tile_id` at `(x, y)` with `rotation`."
///
/// Sent by the active player on every move except their second one, and
/// broadcast back to everyone once the server accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceTile {
    pub player_id: PlayerId,
    pub tile_id: TileId,
    pub rotation: Rotation,
    pub x: u8,
    pub y: u8,
}

/// "Player `player_id`'s token sits at `position` on square `(x, y)`."
///
/// Clients send this on their second move to choose where their token
/// starts. The server also emits it whenever path resolution moves a
/// token, so the same shape doubles as a position update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveToken {
    pub player_id: PlayerId,
    pub x: u8,
    pub y: u8,
    pub position: PathPoint,
}

/// The two things a player can do on their turn.
///
/// A closed set: the turn engine matches on it exhaustively, so adding a
/// third move kind is a compile error everywhere it matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    PlaceTile(PlaceTile),
    MoveToken(MoveToken),
}

impl Move {
    /// The player the move claims to be acting for.
    pub fn player_id(&self) -> PlayerId {
        match self {
            Self::PlaceTile(m) => m.player_id,
            Self::MoveToken(m) => m.player_id,
        }
    }
}

impl From<Move> for Message {
    fn from(mv: Move) -> Self {
        match mv {
            Move::PlaceTile(m) => Message::PlaceTile(m),
            Move::MoveToken(m) => Message::MoveToken(m),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Every message that crosses the client/server boundary.
///
/// `#[serde(tag = "type")]` produces "internally tagged" JSON, so a turn
/// notice looks like `{ "type": "PlayerTurn", "id": 3 }`. The two move
/// variants wrap a struct; serde flattens the struct's fields next to the
/// tag: `{ "type": "PlaceTile", "player_id": 3, "tile_id": 7, ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Server → new client: "you are player `id`."
    Welcome { id: PlayerId },

    /// Server → client: "player `id`, called `name`, is connected."
    PlayerJoined { name: String, id: PlayerId },

    /// Server → client: "player `id` disconnected."
    PlayerLeft { id: PlayerId },

    /// Server → client: "player `id` is out of the current round."
    PlayerEliminated { id: PlayerId },

    /// Server → client: "a round is about to start."
    Countdown,

    /// Server → client: "a round has started."
    GameStart,

    /// Server → one client: "tile `tile_id` was added to your hand."
    AddTileToHand { tile_id: TileId },

    /// Server → client: "it is player `id`'s turn."
    PlayerTurn { id: PlayerId },

    /// Either direction; see [`PlaceTile`].
    PlaceTile(PlaceTile),

    /// Either direction; see [`MoveToken`].
    MoveToken(MoveToken),
}

impl Message {
    /// Extracts the move carried by this message, if it is one.
    ///
    /// Anything else a client sends is not meaningful to the server and
    /// the turn engine simply drops it.
    pub fn into_move(self) -> Option<Move> {
        match self {
            Self::PlaceTile(m) => Some(Move::PlaceTile(m)),
            Self::MoveToken(m) => Some(Move::MoveToken(m)),
            _ => None,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
