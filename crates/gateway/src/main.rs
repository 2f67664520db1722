//! PanelFS command line
//!
//! Operator tool for resolving paths, formatting sizes, and reading or
//! writing files on a daemon.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gateway::config::Config;
use gateway::{
    format_bytes, logging, resolve, DaemonFileGateway, FileEditOrchestrator, ServerContext,
    StaticAuthorizer, TcpTransport, TracingActivityLog, UnitSystem,
};
use tokio::io::AsyncReadExt;

/// Name recorded as the actor for writes made from the command line.
const CLI_ACTOR: &str = "cli";

/// PanelFS - sandboxed file access to remote daemons.
#[derive(Parser, Debug)]
#[command(name = "panelfs")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the canonical form of a path
    Resolve {
        /// Raw path, e.g. "plugins/../server.properties"
        path: String,
    },

    /// Format a byte count for humans
    Size {
        /// Number of bytes
        #[arg(allow_negative_numbers = true)]
        bytes: i64,

        /// Fractional digits
        #[arg(long, default_value = "2")]
        decimals: u32,

        /// Use KiB/MiB/... (default from config)
        #[arg(long, conflicts_with = "decimal")]
        binary: bool,

        /// Use KB/MB/...
        #[arg(long)]
        decimal: bool,
    },

    /// Print a file from the daemon
    Cat {
        #[command(flatten)]
        target: Target,

        /// Refuse files larger than this (default: files.max_edit_size)
        #[arg(long)]
        max_bytes: Option<u64>,
    },

    /// Replace a file on the daemon with stdin or a local file
    Put {
        #[command(flatten)]
        target: Target,

        /// Read content from this file instead of stdin
        #[arg(long, short)]
        file: Option<PathBuf>,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// A file on a tenant server.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Server identifier
    #[arg(long)]
    server: String,

    /// Sandbox root of the server on the daemon host
    #[arg(long)]
    root: String,

    /// Path relative to the sandbox root
    path: String,
}

/// Subcommands for configuration.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print one setting by dotted key, e.g. files.max_edit_size
    Get { key: String },

    /// Print the effective configuration as TOML
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    config.apply_env_overrides();
    config.validate()?;

    let _log_guard = logging::init(&config.logging, cli.verbose)?;
    if let Some(path) = &cli.config {
        tracing::debug!("Using config file: {:?}", path);
    }

    match cli.command {
        Commands::Resolve { path } => {
            println!("{}", resolve(&path));
        }
        Commands::Size {
            bytes,
            decimals,
            binary,
            decimal,
        } => {
            let units = if binary {
                UnitSystem::Binary
            } else if decimal {
                UnitSystem::Decimal
            } else {
                config.files.unit_system()
            };
            println!("{}", format_bytes(bytes, decimals, units));
        }
        Commands::Cat { target, max_bytes } => {
            let ctx = target.context()?;
            let max_bytes = max_bytes.unwrap_or(config.files.max_edit_size);
            let gateway =
                DaemonFileGateway::with_config(transport(&config)?, config.gateway_config());

            let content = gateway.get_content(&ctx, &target.path, max_bytes).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content.data)?;
            stdout.flush()?;
        }
        Commands::Put { target, file } => {
            let ctx = target.context()?;
            let content = match &file {
                Some(path) => tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = Vec::new();
                    tokio::io::stdin()
                        .read_to_end(&mut buf)
                        .await
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            let checksum = hex::encode(protocol::content_checksum(&content));
            let size = content.len();

            let orchestrator = FileEditOrchestrator::new(
                DaemonFileGateway::with_config(transport(&config)?, config.gateway_config()),
                StaticAuthorizer::allow_all(),
                TracingActivityLog,
                config.files.clone(),
            );
            let written = orchestrator
                .save(CLI_ACTOR, &ctx, &target.path, content)
                .await?;
            println!(
                "Wrote {} to {} (sha256 {})",
                config.files.size_formatter().format(size as i64),
                written,
                checksum
            );
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Get { key } => {
                let value = config
                    .setting(&key)
                    .with_context(|| format!("Unknown setting: {}", key))?;
                match value {
                    serde_json::Value::String(s) => println!("{}", s),
                    other => println!("{}", other),
                }
            }
            ConfigCommands::Show => {
                print!("{}", config.to_toml()?);
            }
        },
    }

    Ok(())
}

impl Target {
    fn context(&self) -> anyhow::Result<ServerContext> {
        ServerContext::new(self.server.clone(), &self.root)
            .with_context(|| format!("Invalid server {}", self.server))
    }
}

fn transport(config: &Config) -> anyhow::Result<TcpTransport> {
    let address = config.daemon.socket_addr()?;
    Ok(TcpTransport::with_timeout(address, config.daemon.timeout()))
}
