//! The stock path-tile board.
//!
//! A round on this board goes:
//!
//! 1. Each player's first tile goes on any empty square along the edge.
//! 2. Their next move picks a start point on that tile, one of the points
//!    facing off the board. The token enters the tile there.
//! 3. Every later tile goes on the empty square the player's token faces.
//!
//! After each move every live token follows the paths as far as they
//! lead. A token led off the board is out, and so are tokens that end up
//! on the same point.

use std::collections::{HashMap, HashSet};

use tilepath_protocol::{
    MoveToken, PATH_POINTS, PathPoint, PlayerId, ROTATIONS, Rotation, TileId,
};

use crate::tiles::{Tile, generate_tiles};
use crate::{Board, Movement};

/// Width and height of the stock board.
pub const BOARD_SIZE: u8 = 5;

#[derive(Debug, Clone, Copy)]
struct Placed {
    tile: TileId,
    rotation: Rotation,
}

/// A token rests on square `(x, y)` at edge point `point` and faces the
/// neighbouring square across that point. The square may be off the board:
/// a freshly placed token rests just outside, facing its owner's first tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Token {
    x: i32,
    y: i32,
    point: PathPoint,
}

impl Token {
    fn facing(&self) -> (i32, i32) {
        match self.point / 2 {
            0 => (self.x, self.y - 1),
            1 => (self.x + 1, self.y),
            2 => (self.x, self.y + 1),
            _ => (self.x - 1, self.y),
        }
    }
}

/// The point on the neighbouring square that touches `point`.
fn across(point: PathPoint) -> PathPoint {
    match point / 2 {
        0 | 2 => 5 - point,
        _ => (9 - point) % PATH_POINTS,
    }
}

/// A square grid of path tiles with one token per player.
#[derive(Debug, Clone)]
pub struct TileBoard {
    size: u8,
    tiles: Vec<Tile>,
    grid: Vec<Option<Placed>>,
    first_tiles: HashMap<PlayerId, (u8, u8)>,
    tokens: HashMap<PlayerId, Token>,
}

impl TileBoard {
    /// Creates an empty 5×5 board.
    pub fn new() -> Self {
        Self::with_size(BOARD_SIZE)
    }

    /// Creates an empty board of the given width. Sizes below 2 are
    /// raised to 2 so the board always has interior edges.
    pub fn with_size(size: u8) -> Self {
        let size = size.max(2);
        Self {
            size,
            tiles: generate_tiles(),
            grid: vec![None; usize::from(size) * usize::from(size)],
            first_tiles: HashMap::new(),
            tokens: HashMap::new(),
        }
    }

    /// The tile at `(x, y)` and its rotation, if one has been placed.
    pub fn tile_at(&self, x: u8, y: u8) -> Option<(TileId, Rotation)> {
        self.placed(i32::from(x), i32::from(y))
            .map(|p| (p.tile, p.rotation))
    }

    /// Where `player`'s token currently rests, once it is on a tile.
    pub fn token(&self, player: PlayerId) -> Option<(u8, u8, PathPoint)> {
        let token = self.tokens.get(&player)?;
        if !self.in_bounds(token.x, token.y) {
            return None;
        }
        Some((token.x as u8, token.y as u8, token.point))
    }

    /// Number of tiles on the board.
    pub fn placed_count(&self) -> usize {
        self.grid.iter().filter(|cell| cell.is_some()).count()
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        let size = i32::from(self.size);
        (0..size).contains(&x) && (0..size).contains(&y)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| y as usize * usize::from(self.size) + x as usize)
    }

    fn placed(&self, x: i32, y: i32) -> Option<Placed> {
        self.index(x, y).and_then(|i| self.grid[i])
    }

    fn on_edge(&self, x: u8, y: u8) -> bool {
        let last = self.size - 1;
        x == 0 || y == 0 || x == last || y == last
    }

    /// Walks one token along the paths. Returns the resting token and
    /// whether it left the board.
    fn walk(&self, mut token: Token) -> (Token, bool) {
        // Paths are a bijection, so a token can cross each (square, point)
        // at most once.
        let max_steps = usize::from(self.size) * usize::from(self.size) * 4;
        for _ in 0..=max_steps {
            let (nx, ny) = token.facing();
            if !self.in_bounds(nx, ny) {
                return (token, true);
            }
            let Some(placed) = self.placed(nx, ny) else {
                return (token, false);
            };
            let entry = across(token.point);
            let exit = self.tiles[usize::from(placed.tile)].exit(entry, placed.rotation);
            token = Token {
                x: nx,
                y: ny,
                point: exit,
            };
        }
        tracing::warn!(?token, "token walk did not settle");
        (token, false)
    }
}

impl Default for TileBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for TileBoard {
    fn size(&self) -> u8 {
        self.size
    }

    fn tile_kinds(&self) -> TileId {
        self.tiles.len() as TileId
    }

    fn place_tile(
        &mut self,
        x: u8,
        y: u8,
        tile: TileId,
        rotation: Rotation,
        player: PlayerId,
    ) -> bool {
        if tile >= self.tile_kinds() || rotation >= ROTATIONS {
            return false;
        }
        let (xi, yi) = (i32::from(x), i32::from(y));
        let Some(index) = self.index(xi, yi) else {
            return false;
        };
        if self.grid[index].is_some() {
            return false;
        }

        match (self.first_tiles.contains_key(&player), self.tokens.get(&player)) {
            // Opening tile: any free edge square.
            (false, _) => {
                if !self.on_edge(x, y) {
                    return false;
                }
                self.first_tiles.insert(player, (x, y));
            }
            // First tile down, start point not chosen yet.
            (true, None) => return false,
            (true, Some(token)) => {
                if token.facing() != (xi, yi) {
                    return false;
                }
            }
        }

        self.grid[index] = Some(Placed { tile, rotation });
        tracing::trace!(%player, x, y, tile, rotation, "tile placed");
        true
    }

    fn set_start_position(
        &mut self,
        player: PlayerId,
        x: u8,
        y: u8,
        position: PathPoint,
    ) -> bool {
        if position >= PATH_POINTS || self.tokens.contains_key(&player) {
            return false;
        }
        if self.first_tiles.get(&player) != Some(&(x, y)) {
            return false;
        }
        let on_tile = Token {
            x: i32::from(x),
            y: i32::from(y),
            point: position,
        };
        let (ox, oy) = on_tile.facing();
        if self.in_bounds(ox, oy) {
            return false;
        }
        // Rest just outside the board, facing the first tile.
        self.tokens.insert(
            player,
            Token {
                x: ox,
                y: oy,
                point: across(position),
            },
        );
        tracing::trace!(%player, x, y, position, "start position set");
        true
    }

    fn has_start_position(&self, player: PlayerId) -> bool {
        self.tokens.contains_key(&player)
    }

    fn resolve_movement(&mut self, live: &[PlayerId]) -> Movement {
        self.tokens.retain(|player, _| live.contains(player));

        let mut movement = Movement::default();
        let mut off_board = HashSet::new();
        for &player in live {
            let Some(&start) = self.tokens.get(&player) else {
                continue;
            };
            let (end, left) = self.walk(start);
            if end != start {
                self.tokens.insert(player, end);
                movement.updates.push(MoveToken {
                    player_id: player,
                    x: end.x as u8,
                    y: end.y as u8,
                    position: end.point,
                });
            }
            if left {
                off_board.insert(player);
            }
        }

        let mut resting: HashMap<Token, usize> = HashMap::new();
        for (player, token) in &self.tokens {
            if !off_board.contains(player) {
                *resting.entry(*token).or_default() += 1;
            }
        }

        for &player in live {
            let Some(token) = self.tokens.get(&player) else {
                continue;
            };
            let collided = resting.get(token).is_some_and(|&n| n > 1);
            if off_board.contains(&player) || collided {
                movement.eliminated.push(player);
            }
        }
        for player in &movement.eliminated {
            self.tokens.remove(player);
        }
        if !movement.eliminated.is_empty() {
            tracing::debug!(eliminated = ?movement.eliminated, "tokens eliminated");
        }
        movement
    }

    fn reset(&mut self) {
        self.grid.iter_mut().for_each(|cell| *cell = None);
        self.first_tiles.clear();
        self.tokens.clear();
    }
}
