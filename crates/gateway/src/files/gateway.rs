//! Bounded read and gated write of file content through a daemon transport.

use std::time::Duration;

use protocol::{
    ErrorCode, ErrorMessage, FileContentRequest, FileWriteRequest, Message, MAX_CONTENT_SIZE,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::{SandboxedPath, ServerContext};
use crate::error::{GatewayError, Result};
use crate::permissions::PermissionDecision;
use crate::transport::{DaemonTransport, DEFAULT_TIMEOUT_SECS};

/// Settings for a [`DaemonFileGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Upper bound on one daemon exchange, regardless of transport.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Content read from the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    /// Where the content was read from.
    pub path: SandboxedPath,
    /// The complete file content.
    pub data: Vec<u8>,
}

impl FileContent {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Why an exchange produced no reply.
enum Interrupted {
    Cancelled,
    Failed(String),
}

/// Proxies file reads and writes for one daemon.
///
/// Every call is a single request/response with no retry and no caching.
pub struct DaemonFileGateway<T> {
    transport: T,
    config: GatewayConfig,
}

impl<T: DaemonTransport> DaemonFileGateway<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, GatewayConfig::default())
    }

    pub fn with_config(transport: T, config: GatewayConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Read the whole file at `raw_path`, failing with
    /// [`GatewayError::ContentTooLarge`] if it is bigger than `max_bytes`.
    ///
    /// A whole file must fit in one response frame, so `max_bytes` is
    /// lowered to [`MAX_CONTENT_SIZE`] when it asks for more; the error
    /// then reports the lowered limit.
    pub async fn get_content(
        &self,
        ctx: &ServerContext,
        raw_path: &str,
        max_bytes: u64,
    ) -> Result<FileContent> {
        self.get_content_cancellable(ctx, raw_path, max_bytes, &CancellationToken::new())
            .await
    }

    /// [`get_content`](Self::get_content), abandoned with
    /// [`GatewayError::Cancelled`] once `cancel` fires.
    pub async fn get_content_cancellable(
        &self,
        ctx: &ServerContext,
        raw_path: &str,
        max_bytes: u64,
        cancel: &CancellationToken,
    ) -> Result<FileContent> {
        let path = ctx.sandbox(raw_path)?;
        let max_bytes = read_limit(max_bytes);
        debug!(server = %ctx.uuid(), path = %path, max_bytes, "Reading file content");

        let request = Message::FileContentRequest(FileContentRequest {
            server: ctx.uuid().to_string(),
            path: path.as_str().to_string(),
            max_bytes,
        });

        let reply = match self.exchange(request, cancel).await {
            Ok(reply) => reply,
            Err(Interrupted::Cancelled) => return Err(GatewayError::Cancelled),
            Err(Interrupted::Failed(reason)) => {
                warn!(server = %ctx.uuid(), path = %path, error = %reason, "Daemon read failed");
                return Err(GatewayError::DaemonUnavailable(reason));
            }
        };

        match reply {
            // The daemon is asked to enforce the cap; check again so an
            // oversized answer is never handed out, truncated or not.
            Message::FileContentResponse(response) if response.data.len() as u64 > max_bytes => {
                warn!(
                    path = %path,
                    size = response.data.len(),
                    max_bytes,
                    "Daemon returned content over the cap"
                );
                Err(too_large(&path, max_bytes))
            }
            Message::FileContentResponse(response) => Ok(FileContent {
                path,
                data: response.data,
            }),
            Message::Error(err) => Err(read_error(err, &path, max_bytes)),
            other => Err(GatewayError::DaemonUnavailable(format!(
                "unexpected reply to read: {}",
                other.kind()
            ))),
        }
    }

    /// Replace the file at `raw_path` with `content`.
    ///
    /// A denied `decision` fails with [`GatewayError::Forbidden`] before the
    /// path is even looked at. Returns the path that was written.
    pub async fn put_content(
        &self,
        ctx: &ServerContext,
        raw_path: &str,
        content: Vec<u8>,
        decision: impl Into<PermissionDecision>,
    ) -> Result<SandboxedPath> {
        self.put_content_cancellable(ctx, raw_path, content, decision, &CancellationToken::new())
            .await
    }

    /// [`put_content`](Self::put_content) with cancellation.
    ///
    /// Cancelling only stops waiting; a write the daemon already received
    /// may still be applied.
    pub async fn put_content_cancellable(
        &self,
        ctx: &ServerContext,
        raw_path: &str,
        content: Vec<u8>,
        decision: impl Into<PermissionDecision>,
        cancel: &CancellationToken,
    ) -> Result<SandboxedPath> {
        if !decision.into().is_allowed() {
            debug!(server = %ctx.uuid(), path = raw_path, "Write refused: not authorized");
            return Err(GatewayError::Forbidden(format!(
                "not allowed to update files on {}",
                ctx.uuid()
            )));
        }

        let path = ctx.sandbox(raw_path)?;
        let size = content.len() as u64;
        debug!(server = %ctx.uuid(), path = %path, size, "Writing file content");

        let request = Message::FileWriteRequest(FileWriteRequest::new(
            ctx.uuid(),
            path.as_str(),
            content,
        ));

        let reply = match self.exchange(request, cancel).await {
            Ok(reply) => reply,
            Err(Interrupted::Cancelled) => return Err(GatewayError::Cancelled),
            Err(Interrupted::Failed(reason)) => {
                warn!(server = %ctx.uuid(), path = %path, error = %reason, "Daemon write failed");
                return Err(GatewayError::DaemonWriteFailed(reason));
            }
        };

        match reply {
            Message::FileWriteAck(ack) if ack.bytes_written == size => {
                info!(server = %ctx.uuid(), path = %path, size, "File content replaced");
                Ok(path)
            }
            Message::FileWriteAck(ack) => Err(GatewayError::DaemonWriteFailed(format!(
                "daemon stored {} of {} bytes",
                ack.bytes_written, size
            ))),
            Message::Error(err) if err.code == ErrorCode::PermissionDenied => {
                Err(GatewayError::Forbidden(err.message))
            }
            Message::Error(err) => {
                warn!(
                    path = %path,
                    code = ?err.code,
                    error = %err.message,
                    "Daemon rejected write"
                );
                Err(GatewayError::DaemonWriteFailed(err.message))
            }
            other => Err(GatewayError::DaemonWriteFailed(format!(
                "unexpected reply to write: {}",
                other.kind()
            ))),
        }
    }

    async fn exchange(
        &self,
        message: Message,
        cancel: &CancellationToken,
    ) -> std::result::Result<Message, Interrupted> {
        let call = tokio::time::timeout(self.config.timeout, self.transport.request(message));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Interrupted::Cancelled),
            outcome = call => match outcome {
                Ok(Ok(reply)) => Ok(reply),
                Ok(Err(e)) => Err(Interrupted::Failed(e.to_string())),
                Err(_) => Err(Interrupted::Failed(format!(
                    "daemon did not answer within {:?}",
                    self.config.timeout
                ))),
            },
        }
    }
}

/// Cap a requested read limit at what one frame can carry.
fn read_limit(requested: u64) -> u64 {
    let budget = MAX_CONTENT_SIZE as u64;
    if requested > budget {
        debug!(requested, budget, "Read cap lowered to the frame content budget");
        budget
    } else {
        requested
    }
}

fn too_large(path: &SandboxedPath, max_bytes: u64) -> GatewayError {
    GatewayError::ContentTooLarge {
        path: path.to_string(),
        limit: max_bytes,
    }
}

fn read_error(err: ErrorMessage, path: &SandboxedPath, max_bytes: u64) -> GatewayError {
    match err.code {
        ErrorCode::NotFound => GatewayError::NotFound(path.to_string()),
        ErrorCode::ContentTooLarge => too_large(path, max_bytes),
        ErrorCode::PermissionDenied => GatewayError::Forbidden(err.message),
        code => {
            warn!(path = %path, code = ?code, error = %err.message, "Daemon rejected read");
            GatewayError::DaemonUnavailable(err.message)
        }
    }
}
