// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `cmdbridge`.
///
/// With no `--do` command, `cmdbridge` starts a server that executes bridged
/// commands in its own execution context. With `--do CMD`, it connects to an
/// already running server, runs the command through it, relays the live
/// output to stdout and exits with the bridged exit code.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cmdbridge",
    version,
    about = "Bridge shell commands to a long-running local server and relay their output live.",
    long_about = None
)]
pub struct CliArgs {
    /// Connect to a running cmdbridge server and run this command through it.
    ///
    /// If omitted, a cmdbridge server is started instead.
    #[arg(long = "do", value_name = "COMMAND")]
    pub do_command: Option<String>,

    /// Working directory for the bridged command (sender mode only).
    ///
    /// Defaults to the server's current directory.
    #[arg(long, value_name = "PATH")]
    pub workdir: Option<String>,

    /// TCP port the server listens on / the sender connects to.
    #[arg(long, env = "CMDBRIDGE_PORT", default_value_t = 27473, value_name = "PORT")]
    pub port: u16,

    /// Echo each received command into its log channel before running it
    /// (server mode only).
    #[arg(long)]
    pub echo_command: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CMDBRIDGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
