// src/client/mod.rs

//! Sender side of the bridge.
//!
//! The sender allocates a fresh temp file as the log channel, embeds its
//! path in the request, and then deliberately races two activities: the
//! `/cmd` RPC to the server, and a tail follower on that same file. Output
//! lines are relayed to stdout as they arrive; once the RPC resolves the
//! follower is stopped and drained. The temp file is removed when it goes
//! out of scope, on every exit path.
//!
//! Outcome mapping never lets an error look like success: a remote command
//! failure surfaces its real exit code, and a transport or protocol failure
//! surfaces the fallback code with a message.

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::errors::{BridgeError, Result};
use crate::relay::{TailFollower, is_end_marker};
use crate::types::{CommandRequest, CommandResponse, EnvPair, FALLBACK_EXIT_CODE};

/// Prefix marking process environment variables to forward to the server.
///
/// `_CMDENV__FOO=bar` in the sender's environment becomes the pair
/// `("FOO", "bar")` in the request.
pub const ENV_PREFIX: &str = "_CMDENV__";

/// What to send and where.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the server, e.g. `http://127.0.0.1:27473`.
    pub server_url: String,
    /// Shell snippet to run remotely.
    pub command: String,
    /// Working directory for the command; `None` means the server's cwd.
    pub working_directory: Option<String>,
    /// Environment overlay for the command.
    pub environments: Vec<EnvPair>,
}

/// Harvest `_CMDENV__`-prefixed variables from this process's environment.
///
/// Enumeration order of the environment is unspecified, which is fine: the
/// overlay semantics only matter per key.
pub fn collect_bridge_env() -> Vec<EnvPair> {
    bridge_env_from_vars(std::env::vars())
}

/// Pure form of [`collect_bridge_env`], split out for tests.
pub fn bridge_env_from_vars(vars: impl Iterator<Item = (String, String)>) -> Vec<EnvPair> {
    vars.filter_map(|(key, value)| {
        key.strip_prefix(ENV_PREFIX)
            .map(|stripped| EnvPair::new(stripped, value.clone()))
    })
    .collect()
}

/// Run `cfg.command` through the server, relaying its output to stdout,
/// and return the exit code this process should exit with.
///
/// Three outcomes are distinguished:
/// - success: 0
/// - remote command failure: the remote exit code (fallback if it was 0)
/// - transport/protocol failure: the fallback code, with the error logged
pub async fn send_command(cfg: BridgeConfig) -> Result<i32> {
    send_command_with(cfg, |line| println!("{line}")).await
}

/// Like [`send_command`], but every relayed output line is handed to
/// `on_line` instead of being printed. The end-marker is bookkeeping, not
/// command output, and is never passed on.
pub async fn send_command_with<F>(cfg: BridgeConfig, mut on_line: F) -> Result<i32>
where
    F: FnMut(&str),
{
    let temp = tempfile::Builder::new()
        .prefix("cmd-bridge-")
        .tempfile()
        .map_err(|err| BridgeError::Channel(format!("failed to allocate log channel: {err}")))?;
    let log_path = temp.path().to_path_buf();
    debug!(path = %log_path.display(), "allocated log channel");

    let request = CommandRequest {
        command: cfg.command.clone(),
        working_directory: cfg.working_directory.clone().unwrap_or_default(),
        log_file_path: log_path.display().to_string(),
        environments: cfg.environments.clone(),
    };

    let url = format!("{}/cmd", cfg.server_url.trim_end_matches('/'));
    let mut rpc: JoinHandle<Result<CommandResponse>> =
        tokio::spawn(async move { post_command(&url, &request).await });

    // Start following concurrently with the RPC. The follower tolerates the
    // server truncating/recreating the file we just made.
    let mut follower = TailFollower::follow(&log_path, true);

    let mut rpc_result: Option<Result<CommandResponse>> = None;
    loop {
        tokio::select! {
            joined = &mut rpc, if rpc_result.is_none() => {
                // The server responds only after the end-marker is on disk,
                // and stop() drains the file to its end, so every line up to
                // and including the marker is still delivered below.
                follower.stop();
                rpc_result = Some(flatten_join(joined));
            }
            maybe_line = follower.next_line() => match maybe_line {
                Some(line) => {
                    if !is_end_marker(&line) {
                        on_line(&line);
                    }
                }
                None => break,
            }
        }
    }

    let response = match rpc_result {
        Some(res) => res,
        // The follower gave up before the RPC resolved (e.g. the channel
        // never appeared); the RPC result still decides the outcome.
        None => flatten_join(rpc.await),
    };

    // `temp` drops here, removing the channel file on every path.
    Ok(exit_code_for(response))
}

async fn post_command(url: &str, request: &CommandRequest) -> Result<CommandResponse> {
    let client = reqwest::Client::new();
    let resp = client
        .post(url)
        .json(request)
        .send()
        .await
        .map_err(|err| BridgeError::Transport(format!("failed to reach cmdbridge server: {err}")))?;

    // Error responses still carry the envelope (HTTP 400), so decode the
    // body regardless of status.
    let status = resp.status();
    resp.json::<CommandResponse>().await.map_err(|err| {
        BridgeError::Transport(format!("malformed server response (HTTP {status}): {err}"))
    })
}

fn flatten_join(
    joined: std::result::Result<Result<CommandResponse>, tokio::task::JoinError>,
) -> Result<CommandResponse> {
    match joined {
        Ok(inner) => inner,
        Err(err) => Err(BridgeError::Transport(format!("request task failed: {err}"))),
    }
}

fn exit_code_for(response: Result<CommandResponse>) -> i32 {
    match response {
        Ok(resp) if resp.is_ok() => 0,
        Ok(resp) => {
            error!(msg = %resp.msg, exit_code = resp.exit_code, "bridged command failed");
            if resp.exit_code != 0 {
                resp.exit_code
            } else {
                FALLBACK_EXIT_CODE
            }
        }
        Err(err) => {
            error!(error = %err, "bridge call failed");
            FALLBACK_EXIT_CODE
        }
    }
}
