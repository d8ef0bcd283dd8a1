// src/relay/follow.rs

//! Reader side of the log relay: a tail follower.
//!
//! `TailFollower` yields the lines of a channel file as they are appended,
//! as an unbounded lazy sequence. Consuming the next line suspends the
//! caller until either a line is available or [`TailFollower::stop`] is
//! called. Stopping is cooperative: the follower reads the file through to
//! its current end and forwards those lines before ending the sequence, so
//! everything the writer had flushed by the time of the stop is still
//! observed. Lines appended after that final read may be lost; this is a
//! best-effort drain, not a subscription.
//!
//! The target file may not exist yet when `follow` is called (the sender
//! deliberately races follower startup against the server creating the
//! channel). The follower retries the open with a short bounded backoff
//! before giving up; giving up simply ends the line sequence.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

const OPEN_RETRY_ATTEMPTS: u32 = 20;
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(100);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Follows one log channel file as it grows.
///
/// There must be at most one follower per channel; that is kept by the
/// sender allocating a fresh channel path per request.
#[derive(Debug)]
pub struct TailFollower {
    lines: mpsc::Receiver<String>,
    stop_tx: watch::Sender<bool>,
}

impl TailFollower {
    /// Start following `path`.
    ///
    /// With `from_start`, lines already present at open time are yielded
    /// first, in file order, followed by newly appended lines; otherwise
    /// only lines appended after the open are yielded.
    pub fn follow(path: impl AsRef<Path>, from_start: bool) -> Self {
        let path = path.as_ref().to_path_buf();
        let (line_tx, lines) = mpsc::channel(64);
        let (stop_tx, stop_rx) = watch::channel(false);

        tokio::spawn(follow_loop(path, from_start, line_tx, stop_rx));

        Self { lines, stop_tx }
    }

    /// Next line of the channel, or `None` once the follower has stopped.
    ///
    /// Suspends until a line arrives or the follower is stopped.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Stop following. Idempotent; the only cancellation mechanism.
    ///
    /// Lines already flushed to the file are still delivered: the follower
    /// performs one final read to the end of the file before the sequence
    /// ends.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

async fn follow_loop(
    path: PathBuf,
    from_start: bool,
    tx: mpsc::Sender<String>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let Some(mut file) = open_with_retry(&path, &mut stop_rx).await else {
        return;
    };

    if !from_start {
        if let Err(err) = file.seek(SeekFrom::End(0)).await {
            warn!(path = %path.display(), error = %err, "failed to seek to end of log channel");
            return;
        }
    }

    // Bytes read but not yet terminated by a newline. Splitting on raw bytes
    // keeps multi-byte characters intact across read boundaries.
    let mut pending: Vec<u8> = Vec::new();
    let mut buf = vec![0u8; 8192];

    loop {
        let read = tokio::select! {
            // Stop is cooperative: read through to the current end of file
            // first, so a reader stopped after the end-marker was written
            // still observes it.
            _ = stop_rx.changed() => {
                drain_to_eof(&mut file, &mut pending, &tx, &path).await;
                return;
            }
            res = file.read(&mut buf) => res,
        };

        let n = match read {
            Ok(n) => n,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "error reading log channel");
                return;
            }
        };

        if n == 0 {
            // At the current end of file; wait for the writer to append.
            tokio::select! {
                _ = stop_rx.changed() => {
                    drain_to_eof(&mut file, &mut pending, &tx, &path).await;
                    return;
                }
                () = tokio::time::sleep(POLL_INTERVAL) => {}
            }
            continue;
        }

        pending.extend_from_slice(&buf[..n]);
        if !forward_complete_lines(&mut pending, &tx).await {
            debug!(path = %path.display(), "follower consumer dropped; stopping");
            return;
        }
    }
}

/// Forward every newline-terminated record buffered in `pending`.
///
/// Returns `false` if the consumer dropped its end of the line channel.
async fn forward_complete_lines(pending: &mut Vec<u8>, tx: &mpsc::Sender<String>) -> bool {
    while let Some(idx) = pending.iter().position(|&b| b == b'\n') {
        let mut line_bytes: Vec<u8> = pending.drain(..=idx).collect();
        line_bytes.pop();
        let line = String::from_utf8_lossy(&line_bytes).into_owned();
        if tx.send(line).await.is_err() {
            return false;
        }
    }
    true
}

/// Final read after a stop: forward everything already flushed to the file.
async fn drain_to_eof(
    file: &mut File,
    pending: &mut Vec<u8>,
    tx: &mpsc::Sender<String>,
    path: &Path,
) {
    let mut buf = vec![0u8; 8192];
    loop {
        match file.read(&mut buf).await {
            Ok(0) => return,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                if !forward_complete_lines(pending, tx).await {
                    return;
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "error draining log channel");
                return;
            }
        }
    }
}

/// Open the channel file, retrying briefly while it does not exist yet.
async fn open_with_retry(path: &Path, stop_rx: &mut watch::Receiver<bool>) -> Option<File> {
    for attempt in 0..OPEN_RETRY_ATTEMPTS {
        match File::open(path).await {
            Ok(file) => {
                if attempt > 0 {
                    debug!(path = %path.display(), attempt, "log channel appeared after retry");
                }
                return Some(file);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tokio::select! {
                    _ = stop_rx.changed() => return None,
                    () = tokio::time::sleep(OPEN_RETRY_DELAY) => {}
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to open log channel");
                return None;
            }
        }
    }

    warn!(path = %path.display(), "log channel never appeared; giving up");
    None
}
