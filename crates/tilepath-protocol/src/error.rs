//! Error types for the protocol layer.
//!
//! Each crate in Tilepath defines its own error enum, so a
//! `ProtocolError` always means "the bytes were wrong", never "the
//! network was down" or "the move was illegal".

/// Errors that can occur while framing or unframing messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A complete frame arrived but its body is not a valid message.
    ///
    /// `consumed` is the size of the whole bad frame, header included,
    /// so the reader can skip it and carry on with the next one.
    #[cfg(feature = "json")]
    #[error("malformed frame of {consumed} bytes: {source}")]
    Malformed {
        consumed: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A frame header announced a body larger than the protocol allows.
    ///
    /// There is no way to find the next frame boundary after this, so
    /// the connection has to be dropped.
    #[error("frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),
}
