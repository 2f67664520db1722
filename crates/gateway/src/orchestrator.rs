//! File edit orchestration.
//!
//! [`FileEditOrchestrator`] is the single entry point a front end uses to open
//! and save a file: it evaluates the caller's capabilities, drives the
//! [`DaemonFileGateway`], and hands successful writes to the activity log.

use std::borrow::Cow;

use tracing::debug;

use crate::audit::{ActivityLog, ActivityRecord};
use crate::config::FilesConfig;
use crate::context::{SandboxedPath, ServerContext};
use crate::error::{GatewayError, Result};
use crate::files::DaemonFileGateway;
use crate::paths;
use crate::permissions::{Authorizer, Permission};
use crate::transport::DaemonTransport;

/// A file opened for editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorDocument {
    pub path: SandboxedPath,
    pub content: Vec<u8>,
    /// Human-readable size, e.g. `1.5 KiB`.
    pub size_label: String,
}

impl EditorDocument {
    /// Content as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// Coordinates permission checks, gateway calls and auditing.
pub struct FileEditOrchestrator<T, A, L> {
    gateway: DaemonFileGateway<T>,
    authorizer: A,
    activity: L,
    files: FilesConfig,
}

impl<T, A, L> FileEditOrchestrator<T, A, L>
where
    T: DaemonTransport,
    A: Authorizer,
    L: ActivityLog,
{
    pub fn new(
        gateway: DaemonFileGateway<T>,
        authorizer: A,
        activity: L,
        files: FilesConfig,
    ) -> Self {
        Self {
            gateway,
            authorizer,
            activity,
            files,
        }
    }

    pub fn gateway(&self) -> &DaemonFileGateway<T> {
        &self.gateway
    }

    /// Open `raw_path` for `user`, capped at the configured edit size.
    pub async fn open(
        &self,
        user: &str,
        ctx: &ServerContext,
        raw_path: &str,
    ) -> Result<EditorDocument> {
        if !self
            .authorizer
            .decide(user, ctx.uuid(), Permission::FileRead)
            .is_allowed()
        {
            return Err(forbidden(user, Permission::FileRead, ctx));
        }

        let content = self
            .gateway
            .get_content(ctx, raw_path, self.files.max_edit_size)
            .await?;
        let size_label = self.files.size_formatter().format(content.len() as i64);
        debug!(user, server = %ctx.uuid(), path = %content.path, size = %size_label, "Opened file");

        Ok(EditorDocument {
            path: content.path,
            content: content.data,
            size_label,
        })
    }

    /// Save `content` to `raw_path` for `user`.
    ///
    /// Exactly one activity record is written, and only after the daemon
    /// acknowledged the write.
    pub async fn save(
        &self,
        user: &str,
        ctx: &ServerContext,
        raw_path: &str,
        content: Vec<u8>,
    ) -> Result<SandboxedPath> {
        let decision = self
            .authorizer
            .decide(user, ctx.uuid(), Permission::FileUpdate);

        let path = self
            .gateway
            .put_content(ctx, raw_path, content, decision)
            .await?;

        self.activity
            .record(ActivityRecord::file_write(ctx, &path).actor(user));
        Ok(path)
    }

    /// Directory to return to after editing `raw_path`, relative to the
    /// sandbox root.
    pub fn parent_directory(raw_path: &str) -> String {
        paths::parent(&paths::resolve(raw_path)).to_string()
    }
}

fn forbidden(user: &str, permission: Permission, ctx: &ServerContext) -> GatewayError {
    GatewayError::Forbidden(format!("{} lacks {} on {}", user, permission, ctx.uuid()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::StaticAuthorizer;
    use crate::transport::MemoryDaemon;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingLog {
        records: Arc<Mutex<Vec<ActivityRecord>>>,
    }

    impl RecordingLog {
        fn records(&self) -> Vec<ActivityRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl ActivityLog for RecordingLog {
        fn record(&self, record: ActivityRecord) {
            self.records.lock().unwrap().push(record);
        }
    }

    const SERVER: &str = "8f3c2a10";

    fn setup(
        authorizer: StaticAuthorizer,
    ) -> (
        FileEditOrchestrator<MemoryDaemon, StaticAuthorizer, RecordingLog>,
        MemoryDaemon,
        RecordingLog,
        ServerContext,
    ) {
        let daemon = MemoryDaemon::new();
        let log = RecordingLog::default();
        let files = FilesConfig {
            max_edit_size: 64,
            use_binary_prefix: true,
        };
        let orchestrator = FileEditOrchestrator::new(
            DaemonFileGateway::new(daemon.clone()),
            authorizer,
            log.clone(),
            files,
        );
        let ctx = ServerContext::new(SERVER, "/srv/8f3c2a10").unwrap();
        (orchestrator, daemon, log, ctx)
    }

    #[tokio::test]
    async fn test_open_document() {
        let (orchestrator, daemon, _log, ctx) = setup(StaticAuthorizer::read_only());
        daemon.insert(SERVER, "/srv/8f3c2a10/config/paper.yml", "verbose: false\n");

        let doc = orchestrator
            .open("alice", &ctx, "config/./paper.yml")
            .await
            .unwrap();
        assert_eq!(doc.text(), "verbose: false\n");
        assert_eq!(doc.size_label, "15 Bytes");
        assert_eq!(doc.path.relative(), "config/paper.yml");
    }

    #[tokio::test]
    async fn test_open_respects_edit_size() {
        let (orchestrator, daemon, _log, ctx) = setup(StaticAuthorizer::read_only());
        daemon.insert(SERVER, "/srv/8f3c2a10/latest.log", vec![b'.'; 65]);

        let result = orchestrator.open("alice", &ctx, "latest.log").await;
        assert!(matches!(result, Err(GatewayError::ContentTooLarge { limit: 64, .. })));
    }

    #[tokio::test]
    async fn test_open_requires_read_permission() {
        let (orchestrator, daemon, _log, ctx) = setup(StaticAuthorizer::default());

        let result = orchestrator.open("mallory", &ctx, "a.txt").await;
        assert!(matches!(result, Err(GatewayError::Forbidden(_))));
        assert_eq!(daemon.request_count(), 0);
    }

    #[tokio::test]
    async fn test_save_records_one_activity() {
        let (orchestrator, daemon, log, ctx) = setup(StaticAuthorizer::allow_all());

        orchestrator
            .save("alice", &ctx, "plugins/../eula.txt", b"eula=true".to_vec())
            .await
            .unwrap();

        assert_eq!(
            daemon.get(SERVER, "/srv/8f3c2a10/eula.txt"),
            Some(b"eula=true".to_vec())
        );
        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event, "server:file.write");
        assert_eq!(records[0].server, SERVER);
        assert_eq!(records[0].actor.as_deref(), Some("alice"));
        assert_eq!(
            records[0].properties.get("file").map(String::as_str),
            Some("eula.txt")
        );
    }

    #[tokio::test]
    async fn test_save_without_permission_is_not_audited() {
        let (orchestrator, daemon, log, ctx) = setup(StaticAuthorizer::read_only());

        let result = orchestrator
            .save("alice", &ctx, "eula.txt", b"eula=true".to_vec())
            .await;
        assert!(matches!(result, Err(GatewayError::Forbidden(_))));
        assert_eq!(daemon.request_count(), 0);
        assert!(log.records().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_is_not_audited() {
        let (orchestrator, daemon, log, ctx) = setup(StaticAuthorizer::allow_all());
        daemon.set_online(false);

        let result = orchestrator
            .save("alice", &ctx, "eula.txt", b"eula=true".to_vec())
            .await;
        assert!(matches!(result, Err(GatewayError::DaemonWriteFailed(_))));
        assert!(log.records().is_empty());
    }

    #[test]
    fn test_parent_directory() {
        type Orchestrator = FileEditOrchestrator<MemoryDaemon, StaticAuthorizer, RecordingLog>;
        assert_eq!(
            Orchestrator::parent_directory("plugins/Essentials/config.yml"),
            "plugins/Essentials"
        );
        assert_eq!(Orchestrator::parent_directory("/server.properties"), "");
        assert_eq!(Orchestrator::parent_directory("a/b/../../../c.txt"), "");
    }
}
