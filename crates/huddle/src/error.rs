//! Unified error type for the huddle server.

use huddle_protocol::ProtocolError;

/// Top-level error that wraps the layer-specific errors.
///
/// Users of the `huddle` crate deal with this single type instead of
/// importing errors from each sub-crate. The `#[from]` attributes
/// auto-generate `From` impls, so the `?` operator converts sub-crate
/// errors automatically.
///
/// There is no session variant here: session-level rejections are
/// silent no-ops on the wire, handled and logged where they happen —
/// they never propagate out of the handler.
#[derive(Debug, thiserror::Error)]
pub enum HuddleError {
    /// A framing-level error (bad signature, oversized frame, read failure).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A listener-level failure (bind or accept). Fatal to the process.
    #[error("transport failure: {0}")]
    Io(#[from] std::io::Error),
}
