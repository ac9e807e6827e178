//! Connection identity and the per-connection member handle.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Notify;
use tokio::sync::mpsc;

/// Opaque identifier for a connection.
///
/// Session membership is tracked by identity, not by name: two joins
/// carrying the same session name are still different members if they
/// arrived on different connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Handle to one connection, as seen by the session layer.
///
/// A `Member` is what session member lists actually store. It is cheap
/// to clone — an id, a channel sender, and an `Arc`. The connection's
/// reader and writer tasks live in the server crate; this handle reaches
/// them through two one-way signals:
///
/// - [`deliver`](Self::deliver) pushes an already-encoded frame into the
///   connection's outbound channel, drained by its writer task. The
///   channel is unbounded, so delivery never blocks the caller — a slow
///   recipient backs up only its own writer.
/// - [`request_close`](Self::request_close) raises the forced-close
///   signal that the connection's read loop selects on. Used by session
///   teardown to evict the remaining members.
#[derive(Debug, Clone)]
pub struct Member {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Bytes>,
    close: Arc<Notify>,
}

impl Member {
    /// Creates a member handle around a connection's outbound channel.
    pub fn new(id: ConnectionId, outbound: mpsc::UnboundedSender<Bytes>) -> Self {
        Self {
            id,
            outbound,
            close: Arc::new(Notify::new()),
        }
    }

    /// The connection this member handle refers to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues an encoded frame for delivery to this member.
    ///
    /// Returns `false` if the connection's writer is already gone; the
    /// caller logs and moves on, since a dead recipient must never
    /// affect delivery to the others.
    pub fn deliver(&self, frame: Bytes) -> bool {
        self.outbound.send(frame).is_ok()
    }

    /// Asks the connection's read loop to shut down.
    ///
    /// The signal is sticky (a stored permit), so it is not lost if the
    /// read loop is mid-dispatch rather than parked on `select!`.
    pub fn request_close(&self) {
        self.close.notify_one();
    }

    /// Resolves once [`request_close`](Self::request_close) has been
    /// called. The connection's read loop selects on this.
    pub async fn closed(&self) {
        self.close.notified().await;
    }
}

/// Membership is by identity: two handles are the same member exactly
/// when they refer to the same connection.
impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Member {}
