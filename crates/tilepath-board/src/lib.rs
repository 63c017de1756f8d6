//! The board: where tiles lie and where tokens walk.
//!
//! The session engine never looks inside a board. It hands moves to the
//! [`Board`] trait, asks it to resolve token movement, and acts on the
//! answer. [`TileBoard`] is the board the server ships with.

mod tile_board;
mod tiles;

pub use tile_board::{BOARD_SIZE, TileBoard};
pub use tiles::{Tile, generate_tiles};

use tilepath_protocol::{MoveToken, PathPoint, PlayerId, Rotation, TileId};

/// Outcome of one movement resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Movement {
    /// One update per token that moved, in live order.
    pub updates: Vec<MoveToken>,
    /// Players whose tokens were eliminated by this resolution.
    pub eliminated: Vec<PlayerId>,
}

impl Movement {
    /// Returns `true` if nothing moved and nobody was eliminated.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.eliminated.is_empty()
    }
}

/// The board contract consumed by the turn engine.
///
/// All methods are synchronous. The engine only calls them while it holds
/// the session lock, so an implementation never sees concurrent calls.
/// Validation methods return `false` for anything illegal and must leave
/// the board unchanged in that case.
pub trait Board: Send + 'static {
    /// Width and height of the square grid.
    fn size(&self) -> u8;

    /// Number of distinct tile ids; valid ids are `0..tile_kinds()`.
    fn tile_kinds(&self) -> TileId;

    /// Validates and applies a tile placement.
    fn place_tile(
        &mut self,
        x: u8,
        y: u8,
        tile: TileId,
        rotation: Rotation,
        player: PlayerId,
    ) -> bool;

    /// Validates and records a player's starting point on the tile at
    /// `(x, y)`.
    fn set_start_position(
        &mut self,
        player: PlayerId,
        x: u8,
        y: u8,
        position: PathPoint,
    ) -> bool;

    /// Whether `player` has chosen a start position this round.
    fn has_start_position(&self, player: PlayerId) -> bool;

    /// Moves every token of `live` as far as the placed tiles take it.
    fn resolve_movement(&mut self, live: &[PlayerId]) -> Movement;

    /// Clears the board for a new round.
    fn reset(&mut self);
}
