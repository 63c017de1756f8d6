//! Wire protocol for Tilepath.
//!
//! This crate defines the "language" that clients and the session server
//! speak:
//!
//! - **Types** ([`Message`], [`Move`], [`PlayerId`], ...): the records
//!   that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those records are
//!   framed into bytes and found again in a receive buffer.
//! - **Errors** ([`ProtocolError`]): what can go wrong doing so.
//!
//! # Architecture
//!
//! ```text
//! Transport (byte chunks) → Protocol (framed Message) → Session (turns)
//! ```
//!
//! The protocol layer knows nothing about connections, turns or boards.

mod codec;
mod error;
mod types;

pub use codec::{Codec, FRAME_HEADER_LEN, MAX_FRAME_LEN};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Message, Move, MoveToken, PATH_POINTS, PathPoint, PlaceTile, PlayerId,
    ROTATIONS, Rotation, TileId,
};
