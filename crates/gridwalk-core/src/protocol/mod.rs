//! Protocol module containing message types, the binary codec, and the
//! async framing helpers.

pub mod codec;
pub mod messages;
pub mod wire;

pub use codec::{decode_header, decode_message, encode_message, FrameHeader, ProtocolError};
pub use messages::*;
pub use wire::{recv_message, send_message, WireError};
