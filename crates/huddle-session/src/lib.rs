//! Session and membership tracking for the huddle relay.
//!
//! This crate owns the server's only piece of shared mutable state: the
//! mapping from session names to live sessions. It handles:
//!
//! 1. **Identity** — which connection is which ([`ConnectionId`], [`Member`])
//! 2. **Membership** — who created and who joined each session ([`Session`])
//! 3. **Lifecycle** — create, join, leave, and master-driven teardown
//!    ([`SessionRegistry`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Server layer (above)  ← locks the registry, one critical section per op
//!     ↕
//! Session layer (this crate)  ← pure state transitions, no I/O
//!     ↕
//! Protocol layer (below)  ← produces the frames that drive transitions
//! ```
//!
//! The registry itself performs no I/O and never awaits. Concurrency is
//! the caller's concern — the server
//! wraps it in a `tokio::sync::Mutex` so that every registry operation
//! is one atomic critical section. The only "outbound" effect a registry
//! operation has is pushing into a member's delivery channel or raising
//! its close signal, both of which are synchronous and non-blocking.

mod error;
mod member;
mod registry;
mod session;

pub use error::SessionError;
pub use member::{ConnectionId, Member};
pub use registry::{Departure, SessionRegistry};
pub use session::Session;
