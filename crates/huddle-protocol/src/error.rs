//! Error types for the protocol layer.
//!
//! Each crate in huddle defines its own error enum. A `ProtocolError`
//! always means the byte stream itself is broken — never a session-level
//! rejection, which the registry models as a no-op instead.

/// Errors that can occur while framing the byte stream.
///
/// Every variant here is fatal for the connection that produced it:
/// once the fixed-header framing is violated there is no safe way to
/// find the start of the next message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame header carried the wrong magic signature.
    #[error(
        "bad message signature: expected {expected:#010x}, got {found:#010x}"
    )]
    BadSignature {
        /// The signature this side of the connection requires.
        expected: u32,
        /// The signature actually found on the wire.
        found: u32,
    },

    /// The declared payload length exceeds the sanity cap.
    #[error("declared payload length {0} exceeds the frame size limit")]
    PayloadTooLarge(usize),

    /// The underlying transport failed mid-frame.
    ///
    /// Required by `tokio_util::codec::Decoder`, whose framed streams
    /// surface socket errors through the codec's error type.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
