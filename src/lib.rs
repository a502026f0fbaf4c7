//! # `gantt_server`
//!
//! JSON-file backed persistence for a browser Gantt chart editor: tasks,
//! dependency links and users, reconciled on every read and served over a
//! small authenticated HTTP API.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod gantt;
pub mod logging;
pub mod server;

pub use error::{Error, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
