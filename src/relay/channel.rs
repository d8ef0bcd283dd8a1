// src/relay/channel.rs

//! Writer side of the log relay.
//!
//! A `ChannelWriter` owns the backing file of one log channel. Every line is
//! flushed as soon as it is written so a concurrent tail follower observes
//! it with minimal delay; flush-on-write is the one property the relay
//! exists to provide. No filtering or transformation happens here.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::errors::{BridgeError, Result};
use crate::exec::sink::LineSink;

/// Set of channel paths currently open for writing.
///
/// Shared by all in-flight requests of one server; passed explicitly rather
/// than held in process-wide state so nothing outlives the server that owns
/// it.
pub type ChannelRegistry = Arc<Mutex<HashSet<PathBuf>>>;

/// Create an empty channel registry.
pub fn new_registry() -> ChannelRegistry {
    Arc::new(Mutex::new(HashSet::new()))
}

fn lock_registry(registry: &ChannelRegistry) -> MutexGuard<'_, HashSet<PathBuf>> {
    // A poisoned lock only means another request panicked mid-insert; the
    // set itself is still usable.
    match registry.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Single-writer handle to one log channel.
#[derive(Debug)]
pub struct ChannelWriter {
    path: PathBuf,
    file: Option<File>,
    registry: ChannelRegistry,
}

impl ChannelWriter {
    /// Create (or truncate) the channel file at `path` and register it.
    ///
    /// Fails with a channel error if a writer for the same path is already
    /// open, or if the location is not writable. On failure no process may
    /// be launched for the request.
    pub fn open(registry: &ChannelRegistry, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        {
            let mut open_paths = lock_registry(registry);
            if !open_paths.insert(path.clone()) {
                return Err(BridgeError::Channel(format!(
                    "log channel {} is already open",
                    path.display()
                )));
            }
        }

        let file = match File::create(&path) {
            Ok(file) => file,
            Err(err) => {
                lock_registry(registry).remove(&path);
                return Err(BridgeError::Channel(format!(
                    "failed to create log channel {}: {err}",
                    path.display()
                )));
            }
        };

        debug!(path = %path.display(), "log channel opened");
        Ok(Self {
            path,
            file: Some(file),
            registry: Arc::clone(registry),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the channel and release its path for reuse.
    ///
    /// Idempotent: closing an already-closed channel is a no-op.
    pub fn close(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            lock_registry(&self.registry).remove(&self.path);
            debug!(path = %self.path.display(), "log channel closed");
        }
    }
}

impl LineSink for ChannelWriter {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            BridgeError::Channel(format!(
                "log channel {} is closed",
                self.path.display()
            ))
        })?;
        file.write_all(line.as_bytes()).map_err(|err| {
            BridgeError::Channel(format!(
                "failed to write to log channel {}: {err}",
                self.path.display()
            ))
        })?;
        file.write_all(b"\n").and_then(|()| file.flush()).map_err(|err| {
            BridgeError::Channel(format!(
                "failed to flush log channel {}: {err}",
                self.path.display()
            ))
        })?;
        Ok(())
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        self.close();
    }
}
