//! TCP transport to a remote daemon.
//!
//! Each request opens a fresh connection, writes one envelope, reads one
//! envelope back and closes. The whole exchange (connect included) is bounded
//! by the transport timeout.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use protocol::{Envelope, FrameCodec, Message};
use tokio::net::TcpStream;

use super::{read_envelope, write_envelope, DaemonTransport, TransportError};

/// Default timeout for a daemon exchange in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Transport that talks to a daemon over TCP.
#[derive(Debug)]
pub struct TcpTransport {
    address: SocketAddr,
    timeout: Duration,
    codec: FrameCodec,
    sequence: AtomicU64,
}

impl TcpTransport {
    /// Create a transport for the daemon at `address` with the default
    /// timeout.
    pub fn new(address: SocketAddr) -> Self {
        Self::with_timeout(address, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with a custom timeout.
    pub fn with_timeout(address: SocketAddr, timeout: Duration) -> Self {
        Self {
            address,
            timeout,
            codec: FrameCodec::new(),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn exchange(&self, sequence: u64, message: Message) -> Result<Message, TransportError> {
        let mut stream =
            TcpStream::connect(self.address)
                .await
                .map_err(|e| TransportError::Unreachable {
                    address: self.address.to_string(),
                    reason: e.to_string(),
                })?;
        stream.set_nodelay(true).ok();

        write_envelope(&mut stream, &self.codec, &Envelope::new(sequence, message)).await?;
        let response = read_envelope(&mut stream, &self.codec).await?;

        if response.sequence != sequence {
            return Err(TransportError::SequenceMismatch {
                expected: sequence,
                got: response.sequence,
            });
        }
        Ok(response.payload)
    }
}

impl DaemonTransport for TcpTransport {
    async fn request(&self, message: Message) -> Result<Message, TransportError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let kind = message.kind();
        tracing::trace!(address = %self.address, sequence, kind, "Sending daemon request");

        tokio::time::timeout(self.timeout, self.exchange(sequence, message))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}
