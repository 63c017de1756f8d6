//! The session core of Tilepath.
//!
//! Everything that coordinates a game lives here: admitting connections,
//! running rounds, reading moves from whoever is on turn, forcing moves
//! for idle players, and removing players who disconnect.
//!
//! # Concurrency
//!
//! All game state is one plain struct behind one mutex inside
//! [`Session`]. The tasks that touch it:
//!
//! - the lifecycle loop ([`Session::run`]), which also runs the turn
//!   engine, the only code that reads from client connections;
//! - one registration per incoming connection ([`Session::admit`]);
//! - one watchdog per turn;
//! - one writer per player, which never takes the lock;
//! - the reaper, which removes players whose sends failed.
//!
//! Anything that can race with the engine (a watchdog, a removal) checks
//! a [`TurnStamp`] inside the lock before acting, and discards its work if
//! the turn has moved on.

mod config;
mod dispatch;
mod engine;
mod error;
mod lifecycle;
mod player;
mod registry;
mod session;
mod state;
#[cfg(test)]
mod testing;
mod watchdog;

pub use config::{RoundConfig, RoundPhase, TurnPhase};
pub use error::SessionError;
pub use player::PlayerSnapshot;
pub use session::Session;
pub use state::{SessionSnapshot, TurnStamp};
