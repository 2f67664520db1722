//! Activity records emitted after successful file changes.
//!
//! The persistent activity log is an external collaborator; the gateway only
//! hands finished records to an [`ActivityLog`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::context::{SandboxedPath, ServerContext};

/// Event name recorded for a content write.
pub const EVENT_FILE_WRITE: &str = "server:file.write";

/// One audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRecord {
    /// Event name, e.g. `server:file.write`.
    pub event: String,
    /// Identifier of the affected server.
    pub server: String,
    /// Acting user, when known.
    pub actor: Option<String>,
    /// Event-specific properties.
    pub properties: BTreeMap<String, String>,
}

impl ActivityRecord {
    pub fn new(event: impl Into<String>, ctx: &ServerContext) -> Self {
        Self {
            event: event.into(),
            server: ctx.uuid().to_string(),
            actor: None,
            properties: BTreeMap::new(),
        }
    }

    /// Record for a write to `path`. The `file` property is the path
    /// relative to the sandbox root.
    pub fn file_write(ctx: &ServerContext, path: &SandboxedPath) -> Self {
        Self::new(EVENT_FILE_WRITE, ctx).property("file", path.relative())
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Sink for activity records.
pub trait ActivityLog: Send + Sync {
    fn record(&self, record: ActivityRecord);
}

/// Writes activity records to the `panelfs::activity` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivityLog;

impl ActivityLog for TracingActivityLog {
    fn record(&self, record: ActivityRecord) {
        let properties = serde_json::to_string(&record.properties).unwrap_or_default();
        tracing::info!(
            target: "panelfs::activity",
            event = %record.event,
            server = %record.server,
            actor = record.actor.as_deref().unwrap_or("-"),
            properties = %properties,
            "activity"
        );
    }
}
