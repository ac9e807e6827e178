//! `HuddleServer` builder and accept loop.
//!
//! This is the entry point for running a relay. It owns the TCP
//! listener and the shared server state; each accepted connection gets
//! its own handler task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use huddle_session::{ConnectionId, SessionRegistry};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::HuddleError;
use crate::handler::handle_connection;

/// Port used when no explicit configuration is given.
pub const DEFAULT_PORT: u16 = 4000;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry sits behind a `Mutex`: every create/join/remove/lookup is
/// one critical section, which is what keeps concurrent connection
/// handlers from tearing the membership state.
pub(crate) struct ServerState {
    pub(crate) registry: Mutex<SessionRegistry>,
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,no_run
/// # use huddle::HuddleServerBuilder;
/// # async fn run() -> Result<(), huddle::HuddleError> {
/// let server = HuddleServerBuilder::new()
///     .bind("0.0.0.0:4000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct HuddleServerBuilder {
    bind_addr: String,
}

impl HuddleServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{DEFAULT_PORT}"),
        }
    }

    /// Sets the address to bind the listener to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// # Errors
    /// [`HuddleError::Io`] if the address cannot be bound — fatal, per
    /// the error taxonomy (no retry at the listener level).
    pub async fn build(self) -> Result<HuddleServer, HuddleError> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        tracing::info!(addr = %self.bind_addr, "relay listening");

        let state = Arc::new(ServerState {
            registry: Mutex::new(SessionRegistry::new()),
        });

        Ok(HuddleServer { listener, state })
    }
}

impl Default for HuddleServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct HuddleServer {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl HuddleServer {
    /// Creates a new builder.
    pub fn builder() -> HuddleServerBuilder {
        HuddleServerBuilder::new()
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop.
    ///
    /// Spawns a handler task per connection. Individual connections fail
    /// independently (fail-fast per connection, fail-open for the rest);
    /// an accept error is fatal and ends the loop.
    pub async fn run(self) -> Result<(), HuddleError> {
        tracing::info!("huddle relay running");

        loop {
            let (stream, addr) = self.listener.accept().await?;
            let id = ConnectionId::new(
                NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            );
            tracing::debug!(%id, %addr, "accepted connection");

            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, id, state).await {
                    tracing::debug!(%id, error = %e, "connection ended with error");
                }
            });
        }
    }
}
