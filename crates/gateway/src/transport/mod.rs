//! Panel-to-daemon transport.
//!
//! A [`DaemonTransport`] carries one request [`Message`] to a daemon and
//! returns its reply. Two implementations exist:
//!
//! - [`TcpTransport`]: framed envelopes over a TCP connection per request
//! - [`MemoryDaemon`]: an in-process daemon for tests and local tooling,
//!   which can also serve real TCP connections
//!
//! Both sides of a TCP exchange use [`write_envelope`] and [`read_envelope`],
//! so the wire format is defined in one place.

mod memory;
mod tcp;

pub use memory::MemoryDaemon;
pub use tcp::{TcpTransport, DEFAULT_TIMEOUT_SECS};

use std::time::Duration;

use protocol::{Envelope, Frame, FrameCodec, Message, ProtocolError, FRAME_HEADER_SIZE};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Failures moving a request to the daemon and back.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The daemon could not be connected to.
    #[error("daemon unreachable at {address}: {reason}")]
    Unreachable { address: String, reason: String },

    /// No reply arrived in time.
    #[error("daemon did not answer within {0:?}")]
    Timeout(Duration),

    /// The reply belongs to a different request.
    #[error("response sequence {got} does not match request {expected}")]
    SequenceMismatch { expected: u64, got: u64 },

    /// Encoding, framing or connection failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Sends one request to a daemon and waits for its reply.
#[allow(async_fn_in_trait)]
pub trait DaemonTransport: Send + Sync {
    /// Exchange `message` for the daemon's reply.
    ///
    /// Daemon-side failures come back as `Ok(Message::Error(..))`; `Err` is
    /// reserved for not getting a reply at all.
    async fn request(&self, message: Message) -> Result<Message, TransportError>;
}

/// Encode `envelope` into a frame and write it out.
pub async fn write_envelope<W>(
    writer: &mut W,
    codec: &FrameCodec,
    envelope: &Envelope,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let payload = envelope.to_msgpack()?;
    let bytes = codec.encode(&Frame::new(payload))?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read exactly one frame and decode the envelope it carries.
pub async fn read_envelope<R>(reader: &mut R, codec: &FrameCodec) -> Result<Envelope, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut buf).await?;

    let content_len = FrameCodec::content_length(&buf)?.ok_or_else(|| {
        ProtocolError::Deserialization("truncated frame header".to_string())
    })?;
    // The content length counts the flags byte, which is already in `buf`.
    buf.resize(FRAME_HEADER_SIZE - 1 + content_len, 0);
    reader.read_exact(&mut buf[FRAME_HEADER_SIZE..]).await?;

    let (frame, _) = codec.decode(&buf)?;
    Envelope::from_msgpack(&frame.payload)
}
