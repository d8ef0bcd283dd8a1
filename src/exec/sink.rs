// src/exec/sink.rs

//! Line sink abstraction between the process runner and the log relay.
//!
//! Production code hands the runner a `ChannelWriter`; tests can use
//! [`VecSink`] to capture output without touching the filesystem.

use crate::errors::Result;

/// Destination for command output, one line at a time.
///
/// The sink is sequential-append only; it is never seeked or rewritten.
pub trait LineSink: Send {
    fn write_line(&mut self, line: &str) -> Result<()>;
}

/// In-memory sink used in tests.
#[derive(Debug, Default)]
pub struct VecSink {
    pub lines: Vec<String>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LineSink for VecSink {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}
