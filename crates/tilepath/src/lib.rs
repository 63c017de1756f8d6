//! # Tilepath
//!
//! Session server for a networked path-tile board game.
//!
//! Clients connect over TCP or WebSocket, are welcomed and introduced to
//! each other, and once enough are connected a round starts: tiles are
//! dealt, turns go round the live players, idle players get a move made
//! for them, and the last player on the board wins. Then the board is
//! cleared and the next round begins.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tilepath::prelude::*;
//!
//! # async fn example() -> Result<(), TilepathError> {
//! let server = Server::builder()
//!     .bind("0.0.0.0:30020")
//!     .round_config(RoundConfig {
//!         player_limit: 2,
//!         ..Default::default()
//!     })
//!     .build()
//!     .await?;
//! server.run().await;
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod server;
mod settings;

pub use error::TilepathError;
pub use server::{Monitor, Server, ServerBuilder};
pub use settings::{Settings, TransportKind};

pub mod prelude {
    pub use crate::{Server, ServerBuilder, Settings, TilepathError, TransportKind};
    pub use tilepath_board::{Board, TileBoard};
    pub use tilepath_protocol::{Message, PlayerId};
    pub use tilepath_session::{RoundConfig, RoundPhase, SessionSnapshot};
}
