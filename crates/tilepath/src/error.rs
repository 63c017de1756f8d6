//! Unified error type for the Tilepath server.

use tilepath_protocol::ProtocolError;
use tilepath_session::SessionError;
use tilepath_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TilepathError {
    /// Binding, accepting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session refused a request.
    #[error(transparent)]
    Session(#[from] SessionError),
}
