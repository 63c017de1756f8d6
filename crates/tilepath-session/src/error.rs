//! Error types for the session layer.
//!
//! Nothing here is fatal to a round. Connection faults lead to removal of
//! that one player and every other error is logged where it happens.

use tilepath_protocol::{PlayerId, ProtocolError};
use tilepath_transport::TransportError;

/// Errors that can occur inside the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An outbound message could not be encoded, or an inbound stream
    /// could not be framed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A connection failed while sending or receiving.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The player is not (or no longer) connected.
    #[error("player {0} is not connected")]
    UnknownPlayer(PlayerId),
}
