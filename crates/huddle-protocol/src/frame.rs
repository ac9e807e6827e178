//! Frame types and wire constants.

use bytes::Bytes;

/// Magic signature on every client→server frame.
pub const CLIENT_SIGNATURE: u32 = 0x1234_5678;

/// Magic signature on every server→client frame.
pub const SERVER_SIGNATURE: u32 = 0x9876_5432;

/// Size of the fixed frame header: signature + payload length + type.
pub const HEADER_LEN: usize = 12;

/// Sanity cap on the declared payload length.
///
/// The length field is attacker-controlled; without a cap a single
/// 12-byte header could make the decoder reserve 4 GiB. Frames that
/// declare more than this are treated as a protocol violation.
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// One complete protocol message, as delimited by the fixed header.
///
/// `kind` is the raw message-type word from the wire. The dispatcher
/// decides what (if anything) it means via [`ClientMessageKind::from_wire`];
/// keeping the raw value here lets unknown types flow through the codec
/// without being an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw message type from the header.
    pub kind: u32,
    /// Payload bytes, exactly as they appeared on the wire.
    pub payload: Bytes,
}

impl Frame {
    /// Creates a frame from a raw type word and payload.
    pub fn new(kind: u32, payload: Bytes) -> Self {
        Self { kind, payload }
    }
}

// ---------------------------------------------------------------------------
// Message kinds
// ---------------------------------------------------------------------------

/// Message types a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ClientMessageKind {
    /// Create a new named session; payload is the session name.
    CreateSession = 0x1,
    /// Join an existing session; payload is the session name.
    JoinSession = 0x2,
    /// Fan a payload out to the other members of the sender's session.
    Broadcast = 0x3,
}

impl ClientMessageKind {
    /// Maps a raw wire value to a known client message kind.
    ///
    /// Returns `None` for unknown types — the dispatcher ignores those
    /// rather than killing the connection (permissive dispatch).
    pub fn from_wire(raw: u32) -> Option<Self> {
        match raw {
            0x1 => Some(Self::CreateSession),
            0x2 => Some(Self::JoinSession),
            0x3 => Some(Self::Broadcast),
            _ => None,
        }
    }

    /// The raw wire value for this kind.
    pub fn to_wire(self) -> u32 {
        self as u32
    }
}

/// Message types the server may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ServerMessageKind {
    /// Acknowledges a successful create; payload is the session name.
    CreatedSession = 0x1,
    /// Acknowledges a successful join; payload is the session name.
    JoinedSession = 0x2,
    /// Carries another member's broadcast payload, unmodified.
    BroadcastCommand = 0x3,
}

impl ServerMessageKind {
    /// Maps a raw wire value to a known server message kind.
    pub fn from_wire(raw: u32) -> Option<Self> {
        match raw {
            0x1 => Some(Self::CreatedSession),
            0x2 => Some(Self::JoinedSession),
            0x3 => Some(Self::BroadcastCommand),
            _ => None,
        }
    }

    /// The raw wire value for this kind.
    pub fn to_wire(self) -> u32 {
        self as u32
    }
}
