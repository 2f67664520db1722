//! # PanelFS Protocol Library
//!
//! Wire definitions shared by the panel-side file gateway and the daemon that
//! owns a tenant's files.
//!
//! ## Overview
//!
//! - **Message Definitions**: content read/write requests, acknowledgments,
//!   keepalive and typed error replies
//! - **Frame Codec**: length-prefixed framing with optional LZ4 compression
//! - **Checksums**: SHA-256 digests carried by write requests
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Application Messages           │  MessagePack-encoded
//! ├─────────────────────────────────────────┤
//! │              Framing                    │  Length-prefixed, LZ4
//! ├─────────────────────────────────────────┤
//! │              Transport (TCP)            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{Envelope, Frame, FrameCodec, Message};
//! use protocol::messages::FileContentRequest;
//!
//! let message = Message::FileContentRequest(FileContentRequest {
//!     server: "1a7ce997".to_string(),
//!     path: "/home/container/server.properties".to_string(),
//!     max_bytes: 4 * 1024 * 1024,
//! });
//! let envelope = Envelope::new(1, message);
//!
//! let bytes = envelope.to_msgpack().unwrap();
//! let frame_bytes = FrameCodec::new().encode(&Frame::new(bytes)).unwrap();
//! assert_eq!(&frame_bytes[..4], b"PNLF");
//! ```

pub mod error;
pub mod framing;
pub mod messages;

pub use error::{ProtocolError, Result};
pub use framing::{
    Frame, FrameCodec, FrameFlags, COMPRESSION_THRESHOLD, CONTENT_OVERHEAD, FRAME_HEADER_SIZE,
    FRAME_MAGIC, MAX_CONTENT_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
pub use messages::{
    content_checksum, Envelope, ErrorCode, ErrorMessage, FileContentRequest, FileContentResponse,
    FileWriteAck, FileWriteRequest, Message, Ping, Pong, PROTOCOL_VERSION,
};
