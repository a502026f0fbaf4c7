//! Gantt server binary.
//!
//! This binary is a thin wrapper that parses arguments, installs logging and
//! delegates to the library.

use std::process::ExitCode;

use clap::Parser;
use gantt_server::cli::{run, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.wants_logging() {
        if let Err(e) = gantt_server::logging::init(cli.verbose) {
            eprintln!("Warning: {e}");
        }
        gantt_server::logging::install_panic_hook();
    }

    let output = run(&cli);

    for line in output.stdout {
        println!("{line}");
    }
    for line in output.stderr {
        eprintln!("{line}");
    }

    output.exit_code
}
