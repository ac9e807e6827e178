//! Wire protocol for the huddle session relay.
//!
//! This crate defines the "language" that clients and the relay speak:
//!
//! - **Frames** ([`Frame`], [`ClientMessageKind`], [`ServerMessageKind`]) —
//!   the length-prefixed messages that travel on the wire.
//! - **Codec** ([`FrameCodec`]) — how frames are parsed from and written
//!   to a raw byte stream.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while framing.
//!
//! # Wire format
//!
//! Every message, in either direction, is a fixed 12-byte header followed
//! by a payload. All integers are little-endian:
//!
//! ```text
//! offset 0   u32  magic signature (direction-specific)
//! offset 4   u32  payload length in bytes
//! offset 8   u32  message type
//! offset 12  ...  payload (exactly `payload length` bytes)
//! ```
//!
//! Client→server messages carry [`CLIENT_SIGNATURE`]; server→client
//! messages carry [`SERVER_SIGNATURE`]. A frame with the wrong signature
//! is fatal for the connection — there is no way to resynchronize a
//! length-prefixed stream once framing is lost.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw TCP bytes) and the
//! session layer (membership state). It knows nothing about sessions or
//! connections — it only turns byte streams into frames and back.
//!
//! ```text
//! Transport (bytes) → Protocol (Frame) → Session (membership)
//! ```

mod codec;
mod error;
mod frame;

pub use codec::{FrameCodec, encode_server_frame};
pub use error::ProtocolError;
pub use frame::{
    CLIENT_SIGNATURE, ClientMessageKind, Frame, HEADER_LEN,
    MAX_PAYLOAD_LEN, SERVER_SIGNATURE, ServerMessageKind,
};
