//! Protocol message definitions.
//!
//! Every exchange with the daemon is exactly one request envelope followed by
//! exactly one response envelope carrying the same sequence number. Messages
//! are serialized with MessagePack.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ProtocolError, Result};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Envelope wrapper for all protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Protocol version for compatibility checking.
    pub version: u8,
    /// Correlates a response with its request.
    pub sequence: u64,
    /// The actual message payload.
    pub payload: Message,
}

impl Envelope {
    /// Create a new envelope with the current protocol version.
    pub fn new(sequence: u64, payload: Message) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            sequence,
            payload,
        }
    }

    /// Serialize the envelope to MessagePack bytes.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Deserialize an envelope, rejecting unknown protocol versions.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        let envelope: Self = rmp_serde::from_slice(bytes)?;
        if envelope.version != PROTOCOL_VERSION {
            return Err(ProtocolError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                got: envelope.version,
            });
        }
        Ok(envelope)
    }
}

/// Top-level message enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Message {
    // File messages
    /// Read a whole file, bounded by `max_bytes`.
    FileContentRequest(FileContentRequest),
    /// Full content of a file.
    FileContentResponse(FileContentResponse),
    /// Replace a file's content wholesale.
    FileWriteRequest(FileWriteRequest),
    /// Write was applied.
    FileWriteAck(FileWriteAck),

    // Control messages
    /// Ping for liveness checks.
    Ping(Ping),
    /// Pong response to ping.
    Pong(Pong),
    /// Request failed on the daemon side.
    Error(ErrorMessage),
}

impl Message {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::FileContentRequest(_) => "file_content_request",
            Message::FileContentResponse(_) => "file_content_response",
            Message::FileWriteRequest(_) => "file_write_request",
            Message::FileWriteAck(_) => "file_write_ack",
            Message::Ping(_) => "ping",
            Message::Pong(_) => "pong",
            Message::Error(_) => "error",
        }
    }
}

// ============================================================================
// File Messages
// ============================================================================

/// Request for the full content of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContentRequest {
    /// Identity of the tenant server owning the file.
    pub server: String,
    /// Path anchored under the server's sandbox root.
    pub path: String,
    /// The daemon must refuse files larger than this.
    pub max_bytes: u64,
}

/// Full content of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContentResponse {
    /// Path the content was read from.
    pub path: String,
    /// File bytes.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// Request to replace a file's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWriteRequest {
    /// Identity of the tenant server owning the file.
    pub server: String,
    /// Path anchored under the server's sandbox root.
    pub path: String,
    /// New file content.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    /// SHA-256 digest of `data`.
    #[serde(with = "serde_bytes")]
    pub checksum: Vec<u8>,
}

impl FileWriteRequest {
    /// Build a write request, computing the checksum of `data`.
    pub fn new(server: impl Into<String>, path: impl Into<String>, data: Vec<u8>) -> Self {
        let checksum = content_checksum(&data);
        Self {
            server: server.into(),
            path: path.into(),
            data,
            checksum,
        }
    }

    /// Whether the carried checksum matches the carried data.
    pub fn checksum_matches(&self) -> bool {
        content_checksum(&self.data) == self.checksum
    }
}

/// Acknowledgment of an applied write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWriteAck {
    /// Path that was written.
    pub path: String,
    /// Number of bytes now stored at `path`.
    pub bytes_written: u64,
}

/// SHA-256 digest of file content.
pub fn content_checksum(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

// ============================================================================
// Control Messages
// ============================================================================

/// Liveness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping {
    /// Sender timestamp in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Answer to a [`Ping`], echoing its timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    pub timestamp: u64,
}

/// Error reported by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Error code for programmatic handling.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Optional context (usually the path).
    pub context: Option<String>,
    /// Whether repeating the request could succeed.
    pub recoverable: bool,
}

impl ErrorMessage {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            recoverable: matches!(code, ErrorCode::InternalError | ErrorCode::Timeout),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Error codes for daemon-side failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Unknown or unspecified error.
    Unknown,
    /// The target path does not exist.
    NotFound,
    /// The file is larger than the requested cap.
    ContentTooLarge,
    /// Malformed request or path.
    InvalidRequest,
    /// The daemon refused access to the path.
    PermissionDenied,
    /// Write payload did not match its checksum.
    ChecksumMismatch,
    /// Daemon-side failure.
    InternalError,
    /// Daemon-side timeout.
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(msg: Message) -> Message {
        let envelope = Envelope::new(42, msg);
        let bytes = envelope.to_msgpack().expect("serialization failed");
        let decoded = Envelope::from_msgpack(&bytes).expect("deserialization failed");
        assert_eq!(decoded.sequence, 42);
        decoded.payload
    }

    #[test]
    fn test_envelope_carries_version() {
        let envelope = Envelope::new(1, Message::Ping(Ping { timestamp: 0 }));
        assert_eq!(envelope.version, PROTOCOL_VERSION);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut envelope = Envelope::new(1, Message::Ping(Ping { timestamp: 0 }));
        envelope.version = PROTOCOL_VERSION + 1;
        let bytes = rmp_serde::to_vec(&envelope).unwrap();

        let result = Envelope::from_msgpack(&bytes);
        assert!(matches!(result, Err(ProtocolError::VersionMismatch { .. })));
    }

    #[test]
    fn test_binary_content_survives() {
        let data: Vec<u8> = (0u8..=255).collect();
        let msg = Message::FileContentResponse(FileContentResponse {
            path: "/srv/a/world/level.dat".to_string(),
            data: data.clone(),
        });

        match roundtrip(msg) {
            Message::FileContentResponse(resp) => assert_eq!(resp.data, data),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_bytes_are_packed_compactly() {
        let msg = Message::FileContentResponse(FileContentResponse {
            path: "f".to_string(),
            data: vec![0xAB; 4096],
        });
        let bytes = Envelope::new(1, msg).to_msgpack().unwrap();
        // bin encoding keeps overhead small; a sequence of ints would double it
        assert!(bytes.len() < 4096 + 64, "envelope too large: {}", bytes.len());
    }

    #[test]
    fn test_write_request_checksum() {
        let req = FileWriteRequest::new("srv", "/srv/a/motd.txt", b"hello".to_vec());
        assert_eq!(req.checksum.len(), 32);
        assert!(req.checksum_matches());

        let mut tampered = req.clone();
        tampered.data.push(b'!');
        assert!(!tampered.checksum_matches());
    }

    #[test]
    fn test_known_checksum() {
        let digest = content_checksum(b"Hello, World!");
        assert_eq!(digest[..4], [0xdf, 0xfd, 0x60, 0x21]);
    }

    #[test]
    fn test_error_message_recoverable_defaults() {
        assert!(!ErrorMessage::new(ErrorCode::NotFound, "gone").recoverable);
        assert!(ErrorMessage::new(ErrorCode::InternalError, "disk").recoverable);

        let err = ErrorMessage::new(ErrorCode::ContentTooLarge, "big").with_context("/a");
        assert_eq!(err.context.as_deref(), Some("/a"));
    }

    #[test]
    fn test_error_roundtrip() {
        let msg = Message::Error(ErrorMessage::new(ErrorCode::ChecksumMismatch, "bad digest"));
        assert_eq!(roundtrip(msg.clone()), msg);
    }

    #[test]
    fn test_message_kind() {
        assert_eq!(Message::Pong(Pong { timestamp: 1 }).kind(), "pong");
        let req = Message::FileWriteRequest(FileWriteRequest::new("s", "p", vec![]));
        assert_eq!(req.kind(), "file_write_request");
    }
}
