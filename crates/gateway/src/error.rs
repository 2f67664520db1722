//! Error types surfaced by the file gateway.

use thiserror::Error;

/// Every way a gateway call can fail.
///
/// Each variant is a distinct outcome the caller is expected to translate
/// into its own user-visible message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The raw path cannot name a remote file (e.g. it holds a NUL byte), or
    /// anchoring it would leave the sandbox root.
    #[error("malformed path {path:?}: {reason}")]
    MalformedPath { path: String, reason: String },

    /// The file is larger than the read cap. No content is returned.
    #[error("content too large: {path} exceeds limit of {limit} bytes")]
    ContentTooLarge { path: String, limit: u64 },

    /// The target path does not exist on the remote host.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The daemon could not be reached or failed while reading.
    #[error("daemon unavailable: {0}")]
    DaemonUnavailable(String),

    /// The daemon could not be reached or failed while writing.
    #[error("daemon write failed: {0}")]
    DaemonWriteFailed(String),

    /// The caller lacks the capability for this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The caller abandoned the request before the daemon answered.
    #[error("request cancelled")]
    Cancelled,
}

impl GatewayError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        Self::MalformedPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// HTTP status a web front end should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MalformedPath { .. } => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::ContentTooLarge { .. } => 413,
            Self::Cancelled => 499,
            Self::DaemonUnavailable(_) | Self::DaemonWriteFailed(_) => 502,
        }
    }
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
