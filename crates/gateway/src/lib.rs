//! # PanelFS Gateway Library
//!
//! This crate mediates a control panel's access to files that live on
//! remotely managed hosts ("daemons").
//!
//! ## Overview
//!
//! A caller hands in a user-influenced path string. The gateway:
//!
//! - **Resolves** it into a canonical, traversal-free path ([`paths`])
//! - **Anchors** it under the tenant's sandbox root ([`context`])
//! - **Proxies** a bounded read or a permission-gated write to the daemon
//!   ([`files`], [`transport`])
//! - **Audits** successful writes ([`audit`], [`orchestrator`])
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  FileEditOrchestrator                     │
//! │   Authorizer ──► DaemonFileGateway ──► ActivityLog        │
//! ├───────────────────────────────────────────────────────────┤
//! │  ServerContext::sandbox  =  resolve  +  anchor            │
//! ├───────────────────────────────────────────────────────────┤
//! │  DaemonTransport:  TcpTransport  |  MemoryDaemon          │
//! ├───────────────────────────────────────────────────────────┤
//! │  protocol:  Envelope ─► MessagePack ─► PNLF frame         │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gateway::{DaemonFileGateway, ServerContext, TcpTransport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let transport = TcpTransport::new("10.0.0.5:8080".parse()?);
//!     let gateway = DaemonFileGateway::new(transport);
//!     let ctx = ServerContext::new("8f3c2a10", "/var/lib/panel/volumes/8f3c2a10")?;
//!
//!     let content = gateway.get_content(&ctx, "server.properties", 4 * 1024 * 1024).await?;
//!     println!("{}", String::from_utf8_lossy(&content.data));
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`paths`]: Path resolution and joining
//! - [`size`]: Human-readable byte counts
//! - [`lookup`]: Dot-notation lookup over structured values
//! - [`context`]: Tenant context and sandboxed paths
//! - [`permissions`]: Capability checks
//! - [`transport`]: Daemon transports
//! - [`files`]: Bounded read and gated write
//! - [`audit`]: Activity records
//! - [`orchestrator`]: Open/save coordination
//! - [`config`]: Configuration loading and defaults
//! - [`logging`]: Tracing subscriber setup

pub mod audit;
pub mod config;
pub mod context;
pub mod error;
pub mod files;
pub mod logging;
pub mod lookup;
pub mod orchestrator;
pub mod paths;
pub mod permissions;
pub mod size;
pub mod transport;

// Re-export protocol for convenience
pub use protocol;

pub use audit::{ActivityLog, ActivityRecord, TracingActivityLog};
pub use config::{Config, ConfigError};
pub use context::{ContextError, SandboxedPath, ServerContext};
pub use error::{GatewayError, Result};
pub use files::{DaemonFileGateway, FileContent, GatewayConfig};
pub use orchestrator::{EditorDocument, FileEditOrchestrator};
pub use paths::{join_paths, resolve};
pub use permissions::{Authorizer, Permission, PermissionDecision, StaticAuthorizer};
pub use size::{format_bytes, ByteSize, SizeFormatter, UnitSystem};
pub use transport::{DaemonTransport, MemoryDaemon, TcpTransport, TransportError};
