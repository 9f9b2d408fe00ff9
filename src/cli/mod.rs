//! Command-line interface for swipejury.
//!
//! Provides the `run` pipeline command and the `serve` HTTP server command.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
