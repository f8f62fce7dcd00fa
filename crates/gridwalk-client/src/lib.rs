//! Gridwalk client library.
//!
//! Splits the interactive binary into two testable layers: the network
//! connection (handshake, event stream, outbound requests) and the pure menu
//! input parsing. The binary in `main.rs` wires them to stdin/stdout.

pub mod connection;
pub mod menu;

pub use connection::{ClientConnection, ClientConnectionConfig, ClientError, ClientEvent};
pub use menu::{parse_bounded, parse_choice, MenuChoice, MenuError};
