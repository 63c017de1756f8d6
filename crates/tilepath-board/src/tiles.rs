//! Path tiles.
//!
//! Every square edge carries two path points, numbered clockwise from the
//! top-left one:
//!
//! ```text
//!        0   1
//!      ┌───────┐
//!    7 │       │ 2
//!    6 │       │ 3
//!      └───────┘
//!        5   4
//! ```
//!
//! A tile joins the eight points in four pairs. Rotating a tile a quarter
//! turn clockwise moves every point two steps round the square, so tiles
//! that are rotations of each other are the same kind.

use tilepath_protocol::{PATH_POINTS, PathPoint, ROTATIONS, Rotation};

const POINTS: usize = PATH_POINTS as usize;
const UNSET: PathPoint = PathPoint::MAX;

/// One kind of path tile, stored in its canonical rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tile {
    paths: [PathPoint; POINTS],
}

impl Tile {
    /// The point connected to `entry` when the tile lies with `rotation`
    /// quarter turns applied.
    pub fn exit(&self, entry: PathPoint, rotation: Rotation) -> PathPoint {
        let shift = 2 * (rotation % ROTATIONS);
        let unrotated = (entry + PATH_POINTS - shift) % PATH_POINTS;
        (self.paths[unrotated as usize] + shift) % PATH_POINTS
    }

    /// The connection table in canonical rotation.
    pub fn paths(&self) -> &[PathPoint; POINTS] {
        &self.paths
    }
}

/// Builds every distinct tile kind, sorted by connection table.
///
/// There are 105 ways to pair up eight points and 35 of them are distinct
/// once rotations are folded together.
pub fn generate_tiles() -> Vec<Tile> {
    let mut pairings = Vec::new();
    pair_up(&mut [UNSET; POINTS], &mut pairings);

    let mut kinds: Vec<_> = pairings.iter().map(canonical).collect();
    kinds.sort_unstable();
    kinds.dedup();
    kinds.into_iter().map(|paths| Tile { paths }).collect()
}

fn pair_up(paths: &mut [PathPoint; POINTS], out: &mut Vec<[PathPoint; POINTS]>) {
    let Some(first) = paths.iter().position(|&p| p == UNSET) else {
        out.push(*paths);
        return;
    };
    for other in first + 1..POINTS {
        if paths[other] != UNSET {
            continue;
        }
        paths[first] = other as PathPoint;
        paths[other] = first as PathPoint;
        pair_up(paths, out);
        paths[first] = UNSET;
        paths[other] = UNSET;
    }
}

fn rotate(paths: &[PathPoint; POINTS], rotation: Rotation) -> [PathPoint; POINTS] {
    let shift = 2 * rotation;
    let mut rotated = [0; POINTS];
    for (point, &target) in paths.iter().enumerate() {
        rotated[(point + shift as usize) % POINTS] = (target + shift) % PATH_POINTS;
    }
    rotated
}

fn canonical(paths: &[PathPoint; POINTS]) -> [PathPoint; POINTS] {
    (1..ROTATIONS).fold(*paths, |best, r| best.min(rotate(paths, r)))
}
