//! # huddle
//!
//! A relay server for named collaboration sessions. One client creates
//! a session and becomes its master; others join it by name; any
//! member's broadcast payload is fanned out to every other member.
//! When the master disconnects, the whole session is torn down.
//!
//! This crate ties the layers together: TCP accept loop → frame codec
//! (`huddle-protocol`) → dispatch → session registry (`huddle-session`)
//! → fan-out.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use huddle::HuddleServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), huddle::HuddleError> {
//!     let server = HuddleServerBuilder::new()
//!         .bind("0.0.0.0:4000")
//!         .build()
//!         .await?;
//!     server.run().await
//! }
//! ```

mod broadcast;
mod error;
mod handler;
mod server;

pub use error::HuddleError;
pub use server::{DEFAULT_PORT, HuddleServer, HuddleServerBuilder};
