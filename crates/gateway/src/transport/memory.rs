//! In-process daemon.
//!
//! [`MemoryDaemon`] keeps file contents in memory, keyed by server identifier
//! and anchored path, and answers protocol messages the way a real daemon
//! does. It can be used directly as a [`DaemonTransport`] or put behind a
//! TCP listener with [`MemoryDaemon::serve`].

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use protocol::{
    Envelope, ErrorCode, ErrorMessage, FileContentResponse, FileWriteAck, FrameCodec, Message,
    ProtocolError, Pong,
};
use tokio::net::{TcpListener, TcpStream};

use super::{read_envelope, write_envelope, DaemonTransport, TransportError};

type FileKey = (String, String);

struct Inner {
    files: DashMap<FileKey, Vec<u8>>,
    requests: AtomicUsize,
    online: AtomicBool,
    delay_ms: AtomicU64,
}

/// Daemon double backed by a concurrent map.
///
/// Cloning is cheap; clones share the same files and counters.
#[derive(Clone)]
pub struct MemoryDaemon {
    inner: Arc<Inner>,
}

impl Default for MemoryDaemon {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDaemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDaemon")
            .field("files", &self.inner.files.len())
            .field("requests", &self.request_count())
            .field("online", &self.is_online())
            .finish()
    }
}

impl MemoryDaemon {
    /// An empty, online daemon.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                files: DashMap::new(),
                requests: AtomicUsize::new(0),
                online: AtomicBool::new(true),
                delay_ms: AtomicU64::new(0),
            }),
        }
    }

    /// Store `data` at `path` for `server`, replacing any previous content.
    pub fn insert(&self, server: &str, path: &str, data: impl Into<Vec<u8>>) {
        self.inner
            .files
            .insert((server.to_string(), path.to_string()), data.into());
    }

    /// Current content at `path`, if any.
    pub fn get(&self, server: &str, path: &str) -> Option<Vec<u8>> {
        self.inner
            .files
            .get(&(server.to_string(), path.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Number of requests the daemon has received while online.
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Take the daemon offline or bring it back. An offline daemon refuses
    /// in-process requests and hangs up on TCP clients without answering.
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
    }

    /// Delay every answer by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.inner
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(self.inner.delay_ms.load(Ordering::SeqCst))
    }

    /// Answer one message.
    pub fn handle(&self, message: Message) -> Message {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);

        match message {
            Message::FileContentRequest(req) => {
                let Some(data) = self.get(&req.server, &req.path) else {
                    return error(ErrorCode::NotFound, "no such file", &req.path);
                };
                if data.len() as u64 > req.max_bytes {
                    return error(
                        ErrorCode::ContentTooLarge,
                        format!("file is {} bytes, limit is {}", data.len(), req.max_bytes),
                        &req.path,
                    );
                }
                Message::FileContentResponse(FileContentResponse {
                    path: req.path,
                    data,
                })
            }
            Message::FileWriteRequest(req) => {
                if !req.checksum_matches() {
                    return error(ErrorCode::ChecksumMismatch, "checksum mismatch", &req.path);
                }
                let bytes_written = req.data.len() as u64;
                self.insert(&req.server, &req.path, req.data);
                Message::FileWriteAck(FileWriteAck {
                    path: req.path,
                    bytes_written,
                })
            }
            Message::Ping(ping) => Message::Pong(Pong {
                timestamp: ping.timestamp,
            }),
            other => Message::Error(ErrorMessage::new(
                ErrorCode::InvalidRequest,
                format!("unexpected message: {}", other.kind()),
            )),
        }
    }

    /// Serve one TCP connection until the peer hangs up.
    pub async fn serve_connection(&self, mut stream: TcpStream) -> Result<(), TransportError> {
        let codec = FrameCodec::new();
        loop {
            let request = match read_envelope(&mut stream, &codec).await {
                Ok(request) => request,
                Err(ProtocolError::ConnectionClosed(_)) => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            if !self.is_online() {
                tracing::debug!(sequence = request.sequence, "Daemon offline, hanging up");
                return Ok(());
            }

            tokio::time::sleep(self.delay()).await;
            let reply = self.handle(request.payload);
            let path = match &reply {
                Message::FileContentResponse(response) => Some(response.path.clone()),
                _ => None,
            };

            let envelope = Envelope::new(request.sequence, reply);
            match write_envelope(&mut stream, &codec, &envelope).await {
                // Nothing reached the wire yet, so the peer can still get an answer.
                Err(ProtocolError::FrameTooLarge { size, max }) => {
                    tracing::warn!(
                        sequence = request.sequence,
                        size,
                        max,
                        "Reply exceeds frame size"
                    );
                    let mut err = ErrorMessage::new(
                        ErrorCode::ContentTooLarge,
                        format!("reply of {} bytes does not fit in a {} byte frame", size, max),
                    );
                    if let Some(path) = path {
                        err = err.with_context(path);
                    }
                    let fallback = Envelope::new(request.sequence, Message::Error(err));
                    write_envelope(&mut stream, &codec, &fallback).await?;
                }
                result => result?,
            }
        }
    }

    /// Accept connections on `listener` forever, one task per connection.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            let daemon = self.clone();
            tokio::spawn(async move {
                if let Err(e) = daemon.serve_connection(stream).await {
                    tracing::warn!(peer = %peer, error = %e, "Daemon connection failed");
                }
            });
        }
    }
}

impl DaemonTransport for MemoryDaemon {
    async fn request(&self, message: Message) -> Result<Message, TransportError> {
        if !self.is_online() {
            return Err(TransportError::Unreachable {
                address: "memory".to_string(),
                reason: "daemon offline".to_string(),
            });
        }
        tokio::time::sleep(self.delay()).await;
        Ok(self.handle(message))
    }
}

fn error(code: ErrorCode, message: impl Into<String>, path: &str) -> Message {
    Message::Error(ErrorMessage::new(code, message).with_context(path))
}
