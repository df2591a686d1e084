//! # etherpipe-ipc
//!
//! JSON-RPC 2.0 client for a node daemon listening on a local socket
//! (Unix domain socket or named pipe).
//!
//! The daemon's IPC channel answers requests strictly in order, so the client
//! keeps exactly one call in flight: further calls wait in a FIFO queue and
//! are written only once the active call's reply has been dispatched.
//!
//! - [`client::Client`] is the transport-agnostic state machine.
//! - [`session`] drives it from a real socket on a single tokio task and hands
//!   out a [`session::ClientHandle`] plus a stream of [`events::ClientEvent`]s.

pub mod api;
pub mod client;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod events;
pub mod queue;
pub mod session;
pub mod transport;
pub mod types;

pub use client::{Client, ClientStatus};
pub use error::ClientError;
pub use events::ClientEvent;
pub use session::{spawn, ClientHandle};
pub use types::{CallType, ConnectionQuality, ConnectionState};
