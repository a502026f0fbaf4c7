//! Command-line interface for the Gantt server.
//!
//! The binary only parses arguments and prints what [`run`] returns, so
//! everything here is testable without spawning a process.

mod run;


pub use run::{run, CliOutput};

use crate::config::ServerConfig;
use crate::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gantt server - JSON-file backed store for the Gantt chart editor.
///
/// Settings come from built-in defaults, then `--config`, then environment
/// variables (`DATA_PATH`, `HOST`, `PORT`, `CORS_ORIGIN`, `APP_ENV`,
/// `AUTH_*`), then the flags below.
#[derive(Parser, Debug)]
#[command(name = "gantt-server")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path of the JSON data file (overrides DATA_PATH)
    #[arg(long, global = true)]
    pub data_path: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute; defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP server.
    Serve {
        /// Listen address (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Reconcile the data file once and print what changed.
    ///
    /// Runs the same passes as every read: date normalization, temporary id
    /// migration and referential integrity. The file is rewritten only if
    /// something changed.
    Check,

    /// Print a `salt:hex` hash for AUTH_PASSWORD_HASH.
    #[command(name = "hash-password")]
    HashPassword {
        /// The password to hash
        password: String,
    },

    /// Show version information.
    Version,
}

impl Cli {
    /// The command to run, `serve` when none was given.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve { host: None, port: None })
    }

    /// Resolve the server configuration with this invocation's flags on top.
    ///
    /// # Errors
    ///
    /// Returns an error if `--config` names a file that cannot be loaded.
    pub fn resolve_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::load(self.config.as_deref())?;
        if let Some(path) = &self.data_path {
            config.data_path.clone_from(path);
        }
        if let Some(Command::Serve { host, port }) = &self.command {
            if let Some(host) = host {
                config.host.clone_from(host);
            }
            if let Some(port) = port {
                config.port = *port;
            }
        }
        Ok(config)
    }

    /// Whether the command needs the logger installed.
    #[must_use]
    pub fn wants_logging(&self) -> bool {
        matches!(self.command(), Command::Serve { .. } | Command::Check)
    }
}
