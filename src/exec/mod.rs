// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running a bridged shell command,
//! using `tokio::process::Command`, and feeding its combined stdout/stderr
//! into a [`LineSink`] as it is produced.
//!
//! - [`runner`] spawns the shell, overlays the environment, pumps output
//!   lines and decodes the exit status.
//! - [`sink`] provides the `LineSink` seam between the runner and the log
//!   relay, plus an in-memory implementation for tests.

pub mod runner;
pub mod sink;

pub use runner::{CommandExit, RunSpec, merge_env, run_command};
pub use sink::{LineSink, VecSink};
