//! All gridwalk protocol message types.
//!
//! The wire protocol is deliberately minimal: six message types, each with a
//! fixed payload layout. Multi-byte integers are big-endian on the wire.

use serde::{Deserialize, Serialize};

use crate::domain::params::SimulationParameters;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Total size of the message header in bytes: `type: u32` + `length: u32`.
pub const HEADER_SIZE: usize = 8;

/// Largest payload any receiver will accept.
///
/// The biggest defined payload is START at [`START_PAYLOAD_LEN`] bytes; the
/// only variable-length payload is the free-form HELLO text, which is capped
/// at this bound. A header declaring more than `MAX_PAYLOAD` bytes is
/// rejected before any payload byte is read.
pub const MAX_PAYLOAD: usize = 64;

/// Exact wire size of a START payload.
pub const START_PAYLOAD_LEN: usize = 24;

/// Exact wire size of a STATE payload.
pub const STATE_PAYLOAD_LEN: usize = 20;

// ── Message type codes ────────────────────────────────────────────────────────

/// All message type codes defined by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum MessageType {
    /// Client → server, opens the handshake. Free-form short text payload.
    Hello = 1,
    /// Server → client, completes the handshake. Empty payload.
    HelloAck = 2,
    /// Client → server, requests a simulation run. Fixed 24-byte payload.
    Start = 3,
    /// Server → client, one per walk step. Fixed 20-byte payload.
    State = 4,
    /// Server → client, marks the end of one complete run. Empty payload.
    Done = 5,
    /// Client → server, ends the server process. Empty payload.
    Quit = 6,
}

impl TryFrom<u32> for MessageType {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            1 => Ok(MessageType::Hello),
            2 => Ok(MessageType::HelloAck),
            3 => Ok(MessageType::Start),
            4 => Ok(MessageType::State),
            5 => Ok(MessageType::Done),
            6 => Ok(MessageType::Quit),
            _ => Err(()),
        }
    }
}

// ── Per-message payload structs ───────────────────────────────────────────────

/// STATE: the walker's position after one step of one replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Current column, always in `[0, width)`.
    pub x: i32,
    /// Current row, always in `[0, height)`.
    pub y: i32,
    /// 1-based step index within the current replication.
    pub step: u32,
    /// 1-based replication index.
    pub rep: u32,
    /// Total replications in this run (echoed so the client can render
    /// progress without remembering the START it sent).
    pub reps_total: u32,
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// All valid gridwalk messages, discriminated by type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalkMessage {
    /// Handshake opener with a short informational greeting.
    Hello(String),
    /// Handshake acknowledgement.
    HelloAck,
    /// Simulation request. Parameters are validated by the session layer,
    /// not the codec; structurally any 24-byte payload decodes.
    Start(SimulationParameters),
    /// Per-step walker state.
    State(StateUpdate),
    /// End of one complete run.
    Done,
    /// Server shutdown request.
    Quit,
}

impl WalkMessage {
    /// Returns the [`MessageType`] discriminant for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            WalkMessage::Hello(_) => MessageType::Hello,
            WalkMessage::HelloAck => MessageType::HelloAck,
            WalkMessage::Start(_) => MessageType::Start,
            WalkMessage::State(_) => MessageType::State,
            WalkMessage::Done => MessageType::Done,
            WalkMessage::Quit => MessageType::Quit,
        }
    }
}
