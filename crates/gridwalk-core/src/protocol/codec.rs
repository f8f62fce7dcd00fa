//! Binary codec for encoding and decoding gridwalk protocol messages.
//!
//! Wire format:
//! ```text
//! [type:4][payload_len:4][payload:N]
//! ```
//! Total header size: 8 bytes. All multi-byte integers are big-endian.
//!
//! The codec is symmetric: `decode_message(encode_message(m)) == m` for every
//! message type and every valid payload. Payload layouts are fixed and packed
//! with no padding; the only variable-length payload is the free-form HELLO
//! text.

use thiserror::Error;

use crate::domain::params::SimulationParameters;
use crate::protocol::messages::{
    MessageType, StateUpdate, WalkMessage, HEADER_SIZE, MAX_PAYLOAD, START_PAYLOAD_LEN,
    STATE_PAYLOAD_LEN,
};

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The message type field in the header is not a recognized value.
    #[error("unknown message type: {0}")]
    UnknownMessageType(u32),

    /// The header declares a payload longer than the receiver's capacity.
    ///
    /// This is the hard buffer-safety contract: the receiver must fail here
    /// and must not read the payload at all.
    #[error("declared payload length {declared} exceeds capacity {capacity}")]
    PayloadTooLarge { declared: usize, capacity: usize },

    /// The declared payload length does not match the data actually available.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },

    /// The payload bytes could not be parsed for the declared message type.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Decoded message header: type plus declared payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub message_type: MessageType,
    pub payload_len: usize,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`WalkMessage`] into a byte vector including the 8-byte header.
///
/// Encoding is infallible: every representable message has a wire form. A
/// HELLO greeting longer than [`MAX_PAYLOAD`] bytes is truncated at a UTF-8
/// character boundary so the frame stays decodable.
pub fn encode_message(msg: &WalkMessage) -> Vec<u8> {
    let payload = encode_payload(msg);

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&(msg.message_type() as u32).to_be_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(&payload);
    buf
}

/// Decodes the 8-byte header at the beginning of `bytes`, checking the
/// declared payload length against the caller's `capacity`.
///
/// # Errors
///
/// - [`ProtocolError::InsufficientData`] if fewer than 8 bytes are available.
/// - [`ProtocolError::UnknownMessageType`] for an unrecognized type code.
/// - [`ProtocolError::PayloadTooLarge`] whenever the declared length exceeds
///   `capacity`, for every capacity including 0. Callers must not consume
///   payload bytes after this error.
pub fn decode_header(bytes: &[u8], capacity: usize) -> Result<FrameHeader, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let raw_type = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let message_type = MessageType::try_from(raw_type)
        .map_err(|_| ProtocolError::UnknownMessageType(raw_type))?;

    let payload_len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    if payload_len > capacity {
        return Err(ProtocolError::PayloadTooLarge {
            declared: payload_len,
            capacity,
        });
    }

    Ok(FrameHeader {
        message_type,
        payload_len,
    })
}

/// Decodes one [`WalkMessage`] from the beginning of `bytes`.
///
/// Returns the decoded message and the total number of bytes consumed
/// (header + payload), so the caller can advance their read cursor.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are malformed or the declared
/// payload exceeds [`MAX_PAYLOAD`].
pub fn decode_message(bytes: &[u8]) -> Result<(WalkMessage, usize), ProtocolError> {
    let header = decode_header(bytes, MAX_PAYLOAD)?;

    let total = HEADER_SIZE + header.payload_len;
    if bytes.len() < total {
        return Err(ProtocolError::PayloadLengthMismatch {
            declared: header.payload_len,
            available: bytes.len() - HEADER_SIZE,
        });
    }

    let payload = &bytes[HEADER_SIZE..total];
    let msg = decode_payload(header.message_type, payload)?;
    Ok((msg, total))
}

/// Decodes a payload for an already-decoded header.
///
/// Split out from [`decode_message`] so stream readers that receive the
/// header and payload separately can reuse it.
pub fn decode_payload(
    message_type: MessageType,
    payload: &[u8],
) -> Result<WalkMessage, ProtocolError> {
    match message_type {
        MessageType::Hello => {
            let text = std::str::from_utf8(payload)
                .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))?;
            Ok(WalkMessage::Hello(text.to_string()))
        }
        MessageType::HelloAck => {
            require_empty(payload, "HelloAck")?;
            Ok(WalkMessage::HelloAck)
        }
        MessageType::Start => decode_start(payload).map(WalkMessage::Start),
        MessageType::State => decode_state(payload).map(WalkMessage::State),
        MessageType::Done => {
            require_empty(payload, "Done")?;
            Ok(WalkMessage::Done)
        }
        MessageType::Quit => {
            require_empty(payload, "Quit")?;
            Ok(WalkMessage::Quit)
        }
    }
}

// ── Payload encoding ──────────────────────────────────────────────────────────

fn encode_payload(msg: &WalkMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    match msg {
        WalkMessage::Hello(text) => {
            let bytes = text.as_bytes();
            let mut end = bytes.len().min(MAX_PAYLOAD);
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            buf.extend_from_slice(&bytes[..end]);
        }
        WalkMessage::HelloAck | WalkMessage::Done | WalkMessage::Quit => {} // empty payloads
        WalkMessage::Start(p) => encode_start(&mut buf, p),
        WalkMessage::State(s) => encode_state(&mut buf, s),
    }
    buf
}

fn encode_start(buf: &mut Vec<u8>, p: &SimulationParameters) {
    buf.extend_from_slice(&p.width.to_be_bytes());
    buf.extend_from_slice(&p.height.to_be_bytes());
    buf.extend_from_slice(&p.k_max.to_be_bytes());
    buf.extend_from_slice(&p.reps.to_be_bytes());
    buf.extend_from_slice(&p.seed.to_be_bytes());
    buf.push(p.p_up);
    buf.push(p.p_down);
    buf.push(p.p_left);
    buf.push(p.p_right);
}

fn encode_state(buf: &mut Vec<u8>, s: &StateUpdate) {
    buf.extend_from_slice(&s.x.to_be_bytes());
    buf.extend_from_slice(&s.y.to_be_bytes());
    buf.extend_from_slice(&s.step.to_be_bytes());
    buf.extend_from_slice(&s.rep.to_be_bytes());
    buf.extend_from_slice(&s.reps_total.to_be_bytes());
}

// ── Payload decoding ──────────────────────────────────────────────────────────

fn decode_start(p: &[u8]) -> Result<SimulationParameters, ProtocolError> {
    require_exact(p, START_PAYLOAD_LEN, "Start")?;
    Ok(SimulationParameters {
        width: i32::from_be_bytes([p[0], p[1], p[2], p[3]]),
        height: i32::from_be_bytes([p[4], p[5], p[6], p[7]]),
        k_max: u32::from_be_bytes([p[8], p[9], p[10], p[11]]),
        reps: u32::from_be_bytes([p[12], p[13], p[14], p[15]]),
        seed: u32::from_be_bytes([p[16], p[17], p[18], p[19]]),
        p_up: p[20],
        p_down: p[21],
        p_left: p[22],
        p_right: p[23],
    })
}

fn decode_state(p: &[u8]) -> Result<StateUpdate, ProtocolError> {
    require_exact(p, STATE_PAYLOAD_LEN, "State")?;
    Ok(StateUpdate {
        x: i32::from_be_bytes([p[0], p[1], p[2], p[3]]),
        y: i32::from_be_bytes([p[4], p[5], p[6], p[7]]),
        step: u32::from_be_bytes([p[8], p[9], p[10], p[11]]),
        rep: u32::from_be_bytes([p[12], p[13], p[14], p[15]]),
        reps_total: u32::from_be_bytes([p[16], p[17], p[18], p[19]]),
    })
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn require_exact(buf: &[u8], expected: usize, context: &str) -> Result<(), ProtocolError> {
    if buf.len() != expected {
        Err(ProtocolError::MalformedPayload(format!(
            "{context}: expected exactly {expected} bytes, got {}",
            buf.len()
        )))
    } else {
        Ok(())
    }
}

fn require_empty(buf: &[u8], context: &str) -> Result<(), ProtocolError> {
    if !buf.is_empty() {
        Err(ProtocolError::MalformedPayload(format!(
            "{context}: expected empty payload, got {} bytes",
            buf.len()
        )))
    } else {
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
