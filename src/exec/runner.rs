// src/exec/runner.rs

//! Shell command runner.
//!
//! Runs one command through a login shell, with the server's environment
//! overlaid by the request's pairs, and writes combined stdout/stderr into a
//! [`LineSink`] in the order the lines arrive. Blocks its caller until the
//! child exits.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{BridgeError, Result};
use crate::exec::sink::LineSink;
use crate::types::{CommandRequest, EnvPair};

/// Everything needed to run one bridged command.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Shell snippet, run via `bash --login -c` (or `cmd /C` on Windows).
    pub command: String,
    /// Child working directory; `None` inherits the server's cwd.
    pub working_directory: Option<PathBuf>,
    /// Environment overlay; later pairs shadow earlier ones.
    pub environments: Vec<EnvPair>,
    /// Optional hard deadline. When exceeded the child is killed and the run
    /// is reported as a signal termination. The bridge core never sets this;
    /// it exists for callers that need to impose one.
    pub deadline: Option<Duration>,
}

impl RunSpec {
    pub fn from_request(req: &CommandRequest) -> Self {
        let working_directory = if req.working_directory.is_empty() {
            None
        } else {
            Some(PathBuf::from(&req.working_directory))
        };
        Self {
            command: req.command.clone(),
            working_directory,
            environments: req.environments.clone(),
            deadline: None,
        }
    }
}

/// How a bridged command's process terminated.
///
/// Launch failures are *not* represented here; a process that never ran has
/// no exit, and the runner reports that as [`BridgeError::Launch`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandExit {
    /// The process exited normally with this status code.
    Exited(i32),
    /// The process was terminated by a signal and carries no status code.
    Signaled,
}

impl CommandExit {
    pub fn success(&self) -> bool {
        matches!(self, CommandExit::Exited(0))
    }
}

/// Merge environment pairs into a deduplicated overlay.
///
/// Keys may repeat in a request; the last occurrence wins. The result keeps
/// first-seen key order.
pub fn merge_env(pairs: &[EnvPair]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = Vec::new();
    for pair in pairs {
        match merged.iter_mut().find(|(key, _)| *key == pair.key) {
            Some(entry) => entry.1 = pair.value.clone(),
            None => merged.push((pair.key.clone(), pair.value.clone())),
        }
    }
    merged
}

/// Run the command described by `spec`, streaming combined stdout/stderr
/// into `sink` line by line, and return how the process terminated.
///
/// The shell is invoked as a login shell so user shell configuration (PATH
/// customizations, aliases) is loaded, matching what the user would get in
/// their own terminal.
pub async fn run_command(spec: &RunSpec, sink: &mut dyn LineSink) -> Result<CommandExit> {
    info!(
        command = %spec.command,
        workdir = ?spec.working_directory,
        env_overlay = spec.environments.len(),
        "starting bridged command"
    );

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&spec.command);
        c
    } else {
        let mut c = Command::new("/bin/bash");
        c.arg("--login").arg("-c").arg(&spec.command);
        c
    };

    // Child env = inherited server env overlaid with the request's pairs.
    cmd.envs(merge_env(&spec.environments));

    if let Some(dir) = &spec.working_directory {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // A bad working directory or missing shell surfaces here, before the
    // process ever runs. Callers must be able to tell this apart from a
    // nonzero exit.
    let mut child = cmd.spawn().map_err(|err| {
        BridgeError::Launch(format!(
            "failed to start shell for command {:?}: {err}",
            spec.command
        ))
    })?;

    // Both streams feed one channel; the sink sees lines in arrival order.
    let (line_tx, mut line_rx) = mpsc::channel::<String>(256);
    if let Some(stdout) = child.stdout.take() {
        spawn_line_pump(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_pump(stderr, line_tx.clone());
    }
    drop(line_tx);

    let timeout_at = spec.deadline.map(|d| Instant::now() + d);

    // Drain output until both pipes close (which happens at process exit),
    // or the deadline fires first.
    loop {
        let deadline_sleep = async {
            match timeout_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            maybe_line = line_rx.recv() => match maybe_line {
                Some(line) => sink.write_line(&line)?,
                None => break,
            },
            _ = deadline_sleep => {
                warn!(command = %spec.command, "deadline exceeded; killing child");
                let _ = child.kill().await;
                return Ok(CommandExit::Signaled);
            }
        }
    }

    let status = match timeout_at {
        Some(at) => match tokio::time::timeout_at(at, child.wait()).await {
            Ok(res) => res?,
            Err(_) => {
                warn!(command = %spec.command, "deadline exceeded; killing child");
                let _ = child.kill().await;
                return Ok(CommandExit::Signaled);
            }
        },
        None => child.wait().await?,
    };

    let exit = match status.code() {
        Some(code) => CommandExit::Exited(code),
        // No code means the child was killed by a signal (unix).
        None => CommandExit::Signaled,
    };

    info!(command = %spec.command, exit = ?exit, "bridged command finished");
    Ok(exit)
}

/// Forward lines from one child stream into the shared line channel.
fn spawn_line_pump<R>(stream: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                debug!("line receiver dropped; stopping pump");
                break;
            }
        }
    });
}
