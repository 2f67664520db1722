//! Length-prefixed frame codec with optional LZ4 compression.
//!
//! # Frame Format
//!
//! ```text
//! +--------+----------------+-------+-----------------------+
//! | "PNLF" | length (u32 BE)| flags | payload               |
//! | 4 bytes| 4 bytes        | 1 byte| length - 1 bytes      |
//! +--------+----------------+-------+-----------------------+
//! ```
//!
//! `length` covers the flags byte and the payload. Bit 0 of `flags` marks an
//! LZ4-compressed payload (size-prepended block format).

use crate::error::{ProtocolError, Result};

/// Magic bytes opening every frame.
pub const FRAME_MAGIC: [u8; 4] = *b"PNLF";

/// Payloads larger than this are candidates for compression.
pub const COMPRESSION_THRESHOLD: usize = 1024;

/// Maximum encoded frame size (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Magic + length + flags.
pub const FRAME_HEADER_SIZE: usize = 9;

/// Largest serialized payload a frame may carry, before or after compression.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - FRAME_HEADER_SIZE;

/// Space kept free in a frame for the header, envelope fields and file path.
pub const CONTENT_OVERHEAD: usize = 64 * 1024;

/// Largest file content that fits in a single response frame.
pub const MAX_CONTENT_SIZE: usize = MAX_FRAME_SIZE - CONTENT_OVERHEAD;

/// Bytes before the flags byte.
const PREFIX_SIZE: usize = 8;

/// Per-frame flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFlags(u8);

impl FrameFlags {
    /// Payload is LZ4 compressed.
    pub const COMPRESSED: u8 = 0b0000_0001;

    #[inline]
    pub fn new() -> Self {
        Self(0)
    }

    #[inline]
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    #[inline]
    pub fn as_byte(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn is_compressed(self) -> bool {
        self.0 & Self::COMPRESSED != 0
    }

    /// Return a copy with the compressed bit set or cleared.
    #[inline]
    pub fn with_compressed(self, compressed: bool) -> Self {
        if compressed {
            Self(self.0 | Self::COMPRESSED)
        } else {
            Self(self.0 & !Self::COMPRESSED)
        }
    }
}

/// A decoded frame. The payload is always held uncompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub flags: FrameFlags,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            flags: FrameFlags::new(),
            payload,
        }
    }
}

/// Encoder and decoder for frames.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    compression_enabled: bool,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    /// Codec that compresses large payloads when it pays off.
    pub fn new() -> Self {
        Self {
            compression_enabled: true,
        }
    }

    /// Codec that never compresses.
    pub fn without_compression() -> Self {
        Self {
            compression_enabled: false,
        }
    }

    /// Encode a frame into its wire representation.
    pub fn encode(&self, frame: &Frame) -> Result<Vec<u8>> {
        let payload = &frame.payload;
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: payload.len() + FRAME_HEADER_SIZE,
                max: MAX_FRAME_SIZE,
            });
        }

        let mut flags = frame.flags.with_compressed(false);
        let mut body = None;
        if self.compression_enabled && payload.len() > COMPRESSION_THRESHOLD {
            let compressed = lz4_flex::compress_prepend_size(payload);
            if compressed.len() < payload.len() {
                flags = flags.with_compressed(true);
                body = Some(compressed);
            }
        }
        let body = body.as_deref().unwrap_or(payload.as_slice());

        let content_len = 1 + body.len();
        let mut output = Vec::with_capacity(PREFIX_SIZE + content_len);
        output.extend_from_slice(&FRAME_MAGIC);
        output.extend_from_slice(&(content_len as u32).to_be_bytes());
        output.push(flags.as_byte());
        output.extend_from_slice(body);
        Ok(output)
    }

    /// Decode one frame from the front of `data`.
    ///
    /// Returns the frame and the number of bytes consumed.
    pub fn decode(&self, data: &[u8]) -> Result<(Frame, usize)> {
        match self.try_decode(data)? {
            Some(decoded) => Ok(decoded),
            None => Err(ProtocolError::Deserialization(format!(
                "incomplete frame: have {} bytes",
                data.len()
            ))),
        }
    }

    /// Decode one frame, or `None` if `data` does not yet hold a whole frame.
    pub fn try_decode(&self, data: &[u8]) -> Result<Option<(Frame, usize)>> {
        let Some(content_len) = Self::content_length(data)? else {
            return Ok(None);
        };
        let total = PREFIX_SIZE + content_len;
        if data.len() < total {
            return Ok(None);
        }

        let flags = FrameFlags::from_byte(data[PREFIX_SIZE]);
        let body = &data[FRAME_HEADER_SIZE..total];
        let payload = if flags.is_compressed() {
            decompress(body)?
        } else {
            body.to_vec()
        };

        let frame = Frame {
            flags: flags.with_compressed(false),
            payload,
        };
        Ok(Some((frame, total)))
    }

    /// Parse and validate the header, returning the content length.
    ///
    /// `None` means fewer than [`FRAME_HEADER_SIZE`] bytes are available.
    pub fn content_length(header: &[u8]) -> Result<Option<usize>> {
        if header.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let magic = [header[0], header[1], header[2], header[3]];
        if magic != FRAME_MAGIC {
            return Err(ProtocolError::InvalidFrameMagic {
                expected: u32::from_be_bytes(FRAME_MAGIC),
                got: u32::from_be_bytes(magic),
            });
        }

        let content_len =
            u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
        if PREFIX_SIZE + content_len > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: PREFIX_SIZE + content_len,
                max: MAX_FRAME_SIZE,
            });
        }
        if content_len == 0 {
            return Err(ProtocolError::Deserialization(
                "frame content must include the flags byte".to_string(),
            ));
        }

        Ok(Some(content_len))
    }
}

/// Inflate a size-prepended LZ4 body, refusing to allocate past
/// [`MAX_PAYLOAD_SIZE`].
fn decompress(body: &[u8]) -> Result<Vec<u8>> {
    let Some(prefix) = body.get(..4) else {
        return Err(ProtocolError::Deserialization(
            "compressed payload is missing its size prefix".to_string(),
        ));
    };
    let size = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if size > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: size + FRAME_HEADER_SIZE,
            max: MAX_FRAME_SIZE,
        });
    }

    lz4_flex::decompress_size_prepended(body)
        .map_err(|e| ProtocolError::Deserialization(format!("failed to decompress payload: {}", e)))
}
