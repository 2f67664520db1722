//! Remote file content access.
//!
//! This module provides bounded reads and permission-gated writes of whole
//! files living on a tenant's daemon:
//! - Paths are resolved and anchored under the tenant's sandbox root
//! - Reads never return more than the requested cap, and never truncate
//! - Writes are refused before any network traffic when not authorized
//!
//! # Concurrency
//!
//! There is no locking or versioning. Two writers to the same path end with
//! whichever write the daemon applied last.

pub mod gateway;

pub use gateway::{DaemonFileGateway, FileContent, GatewayConfig};
