//! # gridwalk-core
//!
//! Shared library for the gridwalk simulation service containing the network
//! protocol codec and the simulation domain logic.
//!
//! This crate is used by both the server and client applications. It has no
//! dependencies on sockets or the OS beyond the generic async I/O traits used
//! by the framing helpers.
//!
//! The service itself is small: a server accepts a single client session,
//! runs a parameterized random walk over a toroidal 2-D grid, and streams one
//! STATE message per step back to the client, finishing each run with a DONE
//! message and an aggregate statistics summary.
//!
//! Module map:
//!
//! - **`protocol`** – how bytes travel over the wire. Messages are framed
//!   with an 8-byte `{type, length}` header (big-endian) followed by a
//!   fixed-layout payload, and decoded back into typed Rust values.
//!
//! - **`domain`** – pure simulation logic: validated run parameters, the
//!   weighted-direction walk step with toroidal wraparound, and the
//!   per-replication statistics aggregator.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `gridwalk_core::WalkMessage` instead of the full module path.
pub use domain::params::{ParamError, SimulationParameters};
pub use domain::results::{Results, RunSummary};
pub use domain::walk::{Direction, WalkRng, WalkState};
pub use protocol::codec::{decode_header, decode_message, encode_message, ProtocolError};
pub use protocol::messages::{MessageType, StateUpdate, WalkMessage};
pub use protocol::wire::{recv_message, send_message, WireError};
