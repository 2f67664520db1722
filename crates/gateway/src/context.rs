//! Tenant server context and sandboxed path anchoring.
//!
//! A [`ServerContext`] is passed explicitly into every gateway call; there is
//! no ambient "current tenant". Turning a raw path into a [`SandboxedPath`]
//! happens in three steps:
//!
//! 1. reject input that cannot be a remote path (NUL bytes),
//! 2. [`resolve`] it, clamping traversal at the root,
//! 3. anchor it under the context root and re-check containment.
//!
//! Step 3 does not trust step 2: anchoring verifies the joined result on its
//! own, so a path that somehow still carries `..` is refused rather than
//! sent to the daemon.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{GatewayError, Result};
use crate::paths::{join_paths, resolve};

/// Errors building a [`ServerContext`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("server identifier must not be empty")]
    EmptyIdentifier,

    #[error("sandbox root must be an absolute path, got {0:?}")]
    RelativeRoot(String),
}

/// Identifies a tenant's managed host and its sandbox root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerContext {
    uuid: String,
    name: Option<String>,
    root: String,
}

impl ServerContext {
    /// Build a context. The root is normalized (`/srv//a/` becomes `/srv/a`).
    pub fn new(uuid: impl Into<String>, root: &str) -> std::result::Result<Self, ContextError> {
        let uuid = uuid.into();
        if uuid.trim().is_empty() {
            return Err(ContextError::EmptyIdentifier);
        }
        if !root.starts_with('/') {
            return Err(ContextError::RelativeRoot(root.to_string()));
        }

        Ok(Self {
            uuid,
            name: None,
            root: format!("/{}", resolve(root)),
        })
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Validate, resolve and anchor a raw, user-influenced path.
    pub fn sandbox(&self, raw: &str) -> Result<SandboxedPath> {
        if raw.contains('\0') {
            return Err(GatewayError::malformed(raw, "contains a NUL byte"));
        }
        self.anchor(&resolve(raw))
    }

    /// Anchor an already-resolved path under the sandbox root.
    ///
    /// The joined path is checked independently of how `relative` was
    /// produced: it must contain no `.`/`..` segments and must equal the root
    /// or lie beneath it.
    pub fn anchor(&self, relative: &str) -> Result<SandboxedPath> {
        let full = if relative.is_empty() {
            self.root.clone()
        } else {
            join_paths(&self.root, &[relative])
        };

        if full
            .split('/')
            .any(|segment| segment == "." || segment == "..")
        {
            return Err(GatewayError::malformed(
                relative,
                "traversal segment survived resolution",
            ));
        }
        if !self.contains(&full) {
            return Err(GatewayError::malformed(relative, "escapes the sandbox root"));
        }

        let relative = full
            .strip_prefix(self.root.as_str())
            .unwrap_or_default()
            .trim_start_matches('/')
            .to_string();

        Ok(SandboxedPath {
            server: self.uuid.clone(),
            relative,
            full,
        })
    }

    fn contains(&self, full: &str) -> bool {
        if self.root == "/" {
            return full.starts_with('/');
        }
        full == self.root
            || full
                .strip_prefix(self.root.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for ServerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.uuid),
            None => f.write_str(&self.uuid),
        }
    }
}

/// A path proven to lie under a server's sandbox root.
///
/// Only [`ServerContext::sandbox`] and [`ServerContext::anchor`] construct
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SandboxedPath {
    server: String,
    relative: String,
    full: String,
}

impl SandboxedPath {
    /// Owning server's identifier.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Path relative to the sandbox root; `""` for the root itself.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Absolute path on the daemon host.
    pub fn as_str(&self) -> &str {
        &self.full
    }

    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }
}

impl fmt::Display for SandboxedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}
