//! Command execution for the CLI.

use crate::cli::{Cli, Command};
use crate::config::ServerConfig;
use crate::gantt::{JsonFileStore, ReconcileReport};
use crate::server;
use crate::server::auth;
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

/// Output from running the CLI, with separate stdout and stderr messages.
#[derive(Debug)]
pub struct CliOutput {
    /// Exit code for the process.
    pub exit_code: ExitCode,
    /// Messages to print to stdout.
    pub stdout: Vec<String>,
    /// Messages to print to stderr.
    pub stderr: Vec<String>,
}

impl CliOutput {
    fn success(stdout: Vec<String>) -> Self {
        Self { exit_code: ExitCode::SUCCESS, stdout, stderr: vec![] }
    }

    fn failure(message: String) -> Self {
        Self { exit_code: ExitCode::from(1), stdout: vec![], stderr: vec![message] }
    }
}

/// Run the parsed command line.
pub fn run(cli: &Cli) -> CliOutput {
    match cli.command() {
        Command::Version => run_version(),
        Command::HashPassword { password } => run_hash_password(&password),
        Command::Check => match cli.resolve_config() {
            Ok(config) => run_check(&config.data_path),
            Err(e) => CliOutput::failure(format!("Error loading config: {e}")),
        },
        Command::Serve { .. } => match cli.resolve_config() {
            Ok(config) => run_serve(config),
            Err(e) => CliOutput::failure(format!("Error loading config: {e}")),
        },
    }
}

fn run_version() -> CliOutput {
    CliOutput::success(vec![format!("gantt-server v{}", crate::VERSION)])
}

fn run_hash_password(password: &str) -> CliOutput {
    if password.is_empty() {
        return CliOutput::failure("Error: password must not be empty".to_string());
    }
    match auth::hash_password(password) {
        Ok(hash) => CliOutput::success(vec![hash]),
        Err(e) => CliOutput::failure(format!("Error hashing password: {e}")),
    }
}

/// What `check` prints.
#[derive(Debug, Serialize)]
struct CheckSummary<'a> {
    data_path: String,
    tasks: usize,
    links: usize,
    #[serde(flatten)]
    report: &'a ReconcileReport,
}

fn run_check(data_path: &Path) -> CliOutput {
    let store = JsonFileStore::new(data_path);
    let (doc, report) = match store.reconcile() {
        Ok(result) => result,
        Err(e) => return CliOutput::failure(format!("Error checking data file: {e}")),
    };

    let summary = CheckSummary {
        data_path: data_path.display().to_string(),
        tasks: doc.tasks.len(),
        links: doc.links.len(),
        report: &report,
    };
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => CliOutput::success(vec![json]),
        Err(e) => CliOutput::failure(format!("Error formatting report: {e}")),
    }
}

fn run_serve(config: ServerConfig) -> CliOutput {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => return CliOutput::failure(format!("Error starting runtime: {e}")),
    };

    match runtime.block_on(server::serve(config)) {
        Ok(()) => CliOutput::success(vec![]),
        Err(e) => CliOutput::failure(format!("Server error: {e}")),
    }
}
