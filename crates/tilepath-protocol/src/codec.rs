//! Codec trait and implementations for framing messages on a byte stream.
//!
//! A TCP connection delivers bytes in arbitrary chunks: one `read` can
//! return half a message, or three and a half. A codec here therefore does
//! two jobs. It serializes a value into a *self-delimiting* frame, and it
//! can look at the front of a receive buffer and say either "here is one
//! message, and it used `n` bytes" or "not enough bytes yet".
//!
//! The session layer only talks to the [`Codec`] trait, so the wire format
//! can change without touching any turn logic.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that frames values into bytes and decodes them from a buffer.
///
/// `Send + Sync + 'static`: one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one complete frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails, or
    /// `ProtocolError::FrameTooLarge` if the result would not fit a frame.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Tries to decode one value from the front of `buf`.
    ///
    /// - `Ok(Some((value, consumed)))`: a complete frame was found. The
    ///   caller must drop the first `consumed` bytes before trying again.
    /// - `Ok(None)`: the buffer holds only part of a frame. Leave it alone
    ///   and call again once more bytes have arrived.
    ///
    /// # Errors
    /// - `ProtocolError::Malformed` when a complete frame was found but its
    ///   body does not decode. `consumed` says how much to skip.
    /// - `ProtocolError::FrameTooLarge` when the header announces a frame
    ///   that can never be valid. The stream cannot be resynchronized.
    fn decode_one<T: DeserializeOwned>(
        &self,
        buf: &[u8],
    ) -> Result<Option<(T, usize)>, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// Length of the frame header: a big-endian `u32` body length.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest body a frame may carry. Real messages are well under 200 bytes;
/// anything near this limit is a corrupt or hostile stream.
pub const MAX_FRAME_LEN: u32 = 64 * 1024;

/// A [`Codec`] that frames JSON bodies behind a 4-byte length prefix.
///
/// ```text
/// ┌──────────────┬─────────────────────────────────────┐
/// │ len: u32 (BE)│ {"type":"PlayerTurn","id":3}         │
/// └──────────────┴─────────────────────────────────────┘
/// ```
///
/// JSON keeps the traffic readable in a packet capture; the prefix makes
/// it self-delimiting so it can run over a raw byte stream.
///
/// ## Example
///
/// ```rust
/// use tilepath_protocol::{Codec, JsonCodec, Message, PlayerId};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&Message::PlayerTurn { id: PlayerId(3) }).unwrap();
///
/// // Only half the frame has arrived: nothing to decode yet.
/// let partial: Option<(Message, usize)> =
///     codec.decode_one(&bytes[..bytes.len() / 2]).unwrap();
/// assert!(partial.is_none());
///
/// let (msg, consumed): (Message, usize) =
///     codec.decode_one(&bytes).unwrap().unwrap();
/// assert_eq!(msg, Message::PlayerTurn { id: PlayerId(3) });
/// assert_eq!(consumed, bytes.len());
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        let body = serde_json::to_vec(value).map_err(ProtocolError::Encode)?;
        let len = u32::try_from(body.len())
            .ok()
            .filter(|len| *len <= MAX_FRAME_LEN)
            .ok_or(ProtocolError::FrameTooLarge(body.len()))?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    fn decode_one<T: DeserializeOwned>(
        &self,
        buf: &[u8],
    ) -> Result<Option<(T, usize)>, ProtocolError> {
        let Some(header) = buf.first_chunk::<FRAME_HEADER_LEN>() else {
            return Ok(None);
        };
        let len = u32::from_be_bytes(*header);
        if len > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge(len as usize));
        }

        let consumed = FRAME_HEADER_LEN + len as usize;
        let Some(body) = buf.get(FRAME_HEADER_LEN..consumed) else {
            return Ok(None);
        };

        match serde_json::from_slice(body) {
            Ok(value) => Ok(Some((value, consumed))),
            Err(source) => Err(ProtocolError::Malformed { consumed, source }),
        }
    }
}
