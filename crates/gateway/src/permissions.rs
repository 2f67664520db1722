//! Capability checks consulted before file operations.
//!
//! The authorization subsystem itself lives outside this crate; the gateway
//! only depends on the [`Authorizer`] contract and on the pass/fail
//! [`PermissionDecision`] it produces.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// File capabilities a user may hold on a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Open and read file content.
    #[serde(rename = "file.read")]
    FileRead,
    /// Replace file content.
    #[serde(rename = "file.update")]
    FileUpdate,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileRead => "file.read",
            Self::FileUpdate => "file.update",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Allowed,
    Denied,
}

impl PermissionDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

impl From<bool> for PermissionDecision {
    fn from(allowed: bool) -> Self {
        if allowed {
            Self::Allowed
        } else {
            Self::Denied
        }
    }
}

/// Answers "may `user` do `permission` on `server`?".
pub trait Authorizer: Send + Sync {
    fn can(&self, user: &str, server: &str, permission: Permission) -> bool;

    /// Evaluate a check into a [`PermissionDecision`].
    fn decide(&self, user: &str, server: &str, permission: Permission) -> PermissionDecision {
        self.can(user, server, permission).into()
    }
}

/// Grants the same fixed set of permissions to every user on every server.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizer {
    granted: HashSet<Permission>,
}

impl StaticAuthorizer {
    pub fn new(granted: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
        }
    }

    /// Read and write everything.
    pub fn allow_all() -> Self {
        Self::new([Permission::FileRead, Permission::FileUpdate])
    }

    /// Read everything, write nothing.
    pub fn read_only() -> Self {
        Self::new([Permission::FileRead])
    }
}

impl Authorizer for StaticAuthorizer {
    fn can(&self, _user: &str, _server: &str, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }
}
