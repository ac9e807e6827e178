//! Error types for the session layer.

use crate::ConnectionId;

/// Application-level rejections from the session registry.
///
/// None of these are fatal: the registry is left exactly as it was, the
/// offending connection stays open, and the server answers with silence
/// (no error frame is defined by the wire protocol).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A session by that name is already registered.
    #[error("session '{0}' already exists")]
    NameTaken(String),

    /// No session is registered under that name.
    #[error("session '{0}' doesn't exist")]
    NotFound(String),

    /// The connection is already in the session's member list.
    #[error("{member} is already in session '{session}'")]
    AlreadyMember {
        /// The duplicate joiner.
        member: ConnectionId,
        /// The session it tried to join again.
        session: String,
    },
}
