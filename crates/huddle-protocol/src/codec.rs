//! Frame codec: incremental parsing and encoding of length-prefixed frames.
//!
//! [`FrameCodec`] implements `tokio_util`'s [`Decoder`] and [`Encoder`]
//! traits, so it plugs straight into `FramedRead`/`FramedWrite`. The
//! decoder is pure buffer transformation: it never blocks and never reads
//! past a declared message boundary. `Ok(None)` means "need more bytes",
//! an `Err` means the stream is unrecoverable and the connection must be
//! terminated.
//!
//! The same codec type serves both directions. The relay uses
//! [`FrameCodec::server`] (decode client frames, encode server frames);
//! clients and tests use [`FrameCodec::client`], the mirror image.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{
    CLIENT_SIGNATURE, Frame, HEADER_LEN, MAX_PAYLOAD_LEN,
    SERVER_SIGNATURE, ServerMessageKind,
};
use crate::ProtocolError;

/// Codec for the fixed-header frame format, parameterized by direction.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    /// Signature every decoded frame must carry.
    decode_signature: u32,
    /// Signature stamped on every encoded frame.
    encode_signature: u32,
}

impl FrameCodec {
    /// Codec for the server side: decodes client frames, encodes
    /// server frames.
    pub fn server() -> Self {
        Self {
            decode_signature: CLIENT_SIGNATURE,
            encode_signature: SERVER_SIGNATURE,
        }
    }

    /// Codec for the client side: decodes server frames, encodes
    /// client frames.
    pub fn client() -> Self {
        Self {
            decode_signature: SERVER_SIGNATURE,
            encode_signature: CLIENT_SIGNATURE,
        }
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<Frame>, ProtocolError> {
        // Not even a full header buffered yet.
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let signature = read_u32_le(src, 0);
        if signature != self.decode_signature {
            // Framing is lost; nothing after this point can be trusted.
            return Err(ProtocolError::BadSignature {
                expected: self.decode_signature,
                found: signature,
            });
        }

        let payload_len = read_u32_le(src, 4) as usize;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge(payload_len));
        }

        if src.len() < HEADER_LEN + payload_len {
            // Ask for exactly the rest of this frame before the next read.
            src.reserve(HEADER_LEN + payload_len - src.len());
            return Ok(None);
        }

        let kind = read_u32_le(src, 8);
        src.advance(HEADER_LEN);
        let payload = src.split_to(payload_len).freeze();
        Ok(Some(Frame::new(kind, payload)))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(
        &mut self,
        frame: Frame,
        dst: &mut BytesMut,
    ) -> Result<(), ProtocolError> {
        if frame.payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge(frame.payload.len()));
        }

        dst.reserve(HEADER_LEN + frame.payload.len());
        dst.put_u32_le(self.encode_signature);
        dst.put_u32_le(frame.payload.len() as u32);
        dst.put_u32_le(frame.kind);
        dst.extend_from_slice(&frame.payload);
        Ok(())
    }
}

/// Encodes one server→client frame into a standalone byte buffer.
///
/// The broadcaster uses this to encode a fan-out frame exactly once;
/// the resulting [`Bytes`] is refcounted, so handing it to every
/// recipient's writer is free of copies.
pub fn encode_server_frame(
    kind: ServerMessageKind,
    payload: Bytes,
) -> Result<Bytes, ProtocolError> {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    FrameCodec::server().encode(Frame::new(kind.to_wire(), payload), &mut buf)?;
    Ok(buf.freeze())
}

fn read_u32_le(buf: &BytesMut, offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}
