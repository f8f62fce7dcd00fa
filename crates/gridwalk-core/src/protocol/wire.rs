//! Async framing helpers: one [`WalkMessage`] per call over any byte stream.
//!
//! Both endpoints frame the same way: read the fixed 8-byte header with
//! `read_exact`, validate the declared payload length against
//! [`MAX_PAYLOAD`] *before* allocating or reading anything further, then read
//! exactly that many payload bytes. The helpers are generic over the tokio
//! I/O traits so the core crate stays free of sockets.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::codec::{decode_header, decode_payload, encode_message, ProtocolError};
use crate::protocol::messages::{WalkMessage, HEADER_SIZE, MAX_PAYLOAD};

/// Errors produced while sending or receiving a framed message.
#[derive(Debug, Error)]
pub enum WireError {
    /// The underlying transport failed mid-frame.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer sent bytes that do not form a valid message.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The peer closed the connection cleanly on a frame boundary.
    #[error("connection closed by peer")]
    Closed,
}

impl WireError {
    /// True when the error means the connection is unusable, as opposed to a
    /// bad frame on a still-open stream. For this protocol both are terminal,
    /// but callers log the two cases differently.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, WireError::Closed | WireError::Io(_))
    }
}

/// Encodes `msg` and writes the complete frame to `writer`.
pub async fn send_message<W>(writer: &mut W, msg: &WalkMessage) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode_message(msg);
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one complete frame from `reader` and decodes it.
///
/// # Errors
///
/// - [`WireError::Closed`] when the peer shuts down cleanly before a header.
/// - [`WireError::Protocol`] for an unknown type, a declared payload length
///   above [`MAX_PAYLOAD`] (nothing past the header is consumed), or a
///   malformed payload.
/// - [`WireError::Io`] for transport failures, including EOF mid-frame.
pub async fn recv_message<R>(reader: &mut R) -> Result<WalkMessage, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut header_buf = [0u8; HEADER_SIZE];
    if let Err(e) = reader.read_exact(&mut header_buf).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(WireError::Closed);
        }
        return Err(WireError::Io(e));
    }

    let header = decode_header(&header_buf, MAX_PAYLOAD)?;

    // Payload buffer is allocated only after the length check above.
    let mut payload = vec![0u8; header.payload_len];
    if header.payload_len > 0 {
        reader.read_exact(&mut payload).await?;
    }

    Ok(decode_payload(header.message_type, &payload)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
