// src/relay/mod.rs

//! Log relay: the append-only, line-oriented file channel that carries live
//! command output from the executing side to the requesting side.
//!
//! - [`channel`] is the writer side: create/truncate the backing file, write
//!   lines with flush-on-write, idempotent close. A [`ChannelRegistry`]
//!   enforces the one-open-channel-per-path invariant.
//! - [`follow`] is the reader side: a tail follower that yields lines as
//!   they are appended, until stopped.
//!
//! Each channel has exactly one writer and at most one concurrent reader;
//! that discipline is kept by identifier allocation (the sender picks a
//! fresh temp file per request), not by locking inside the relay.

pub mod channel;
pub mod follow;

pub use channel::{ChannelRegistry, ChannelWriter, new_registry};
pub use follow::TailFollower;

/// Reserved token opening the end-marker line.
///
/// The marker is the last line written into a channel, formatted as
/// `[[cmdbridge-finished]]: <status>`. Its absence before the writer closes
/// means the writer terminated prematurely.
pub const END_MARKER: &str = "[[cmdbridge-finished]]";

/// Format the end-marker line for the given overall status.
pub fn end_marker_line(status: crate::types::ResponseStatus) -> String {
    format!("{END_MARKER}: {}", status.as_str())
}

/// True if `line` is an end-marker line.
pub fn is_end_marker(line: &str) -> bool {
    line.starts_with(END_MARKER)
}
