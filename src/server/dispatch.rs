// src/server/dispatch.rs

//! Per-request dispatch orchestration.
//!
//! One request moves through: received → log channel open → running →
//! completed / launch failed. The channel is opened before the process
//! starts, the end-marker is written after it finishes (whatever the
//! outcome), and the channel is closed before the response is returned, so
//! a follower that reads up to the marker has seen all output.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::errors::{BridgeError, Result};
use crate::exec::{CommandExit, LineSink, RunSpec, run_command};
use crate::relay::{ChannelRegistry, ChannelWriter, end_marker_line};
use crate::types::{CommandRequest, CommandResponse, FALLBACK_EXIT_CODE};

/// Execute one command request against the server's execution context.
///
/// Failure semantics:
/// - If the log channel cannot be opened, the request fails immediately; no
///   process is launched and no marker is written.
/// - A launch failure or signal termination maps to an error response with
///   the fallback exit code; a nonzero exit maps to an error response
///   carrying the real code. Either way a `Command failed:` line is written
///   into the channel before the marker.
/// - A failure to write the end-marker after the process has run is logged
///   but never changes the already-determined exit code.
pub async fn dispatch(
    registry: &ChannelRegistry,
    req: &CommandRequest,
    echo_command: bool,
) -> CommandResponse {
    let channel_path = match resolve_channel_path(req) {
        Ok(path) => path,
        Err(err) => {
            return CommandResponse::error(
                format!("failed to allocate log channel: {err}"),
                FALLBACK_EXIT_CODE,
            );
        }
    };

    let mut writer = match ChannelWriter::open(registry, &channel_path) {
        Ok(writer) => writer,
        Err(err) => {
            warn!(path = %channel_path.display(), error = %err, "rejecting command request");
            return CommandResponse::error(err.to_string(), FALLBACK_EXIT_CODE);
        }
    };

    let response = run_to_response(req, &mut writer, echo_command).await;

    if let Err(err) = writer.write_line(&end_marker_line(response.status)) {
        warn!(path = %channel_path.display(), error = %err, "failed to write end-marker");
    }
    writer.close();

    response
}

async fn run_to_response(
    req: &CommandRequest,
    writer: &mut ChannelWriter,
    echo_command: bool,
) -> CommandResponse {
    if echo_command {
        if let Err(err) = writer.write_line(&format!("$ {}", req.command)) {
            warn!(error = %err, "failed to echo command into log channel");
        }
    }

    let spec = RunSpec::from_request(req);
    match run_command(&spec, writer).await {
        Ok(exit) if exit.success() => CommandResponse::ok("Command finished with success"),
        Ok(CommandExit::Exited(code)) => {
            let msg = format!("command exited with code {code}");
            note_failure(writer, &msg);
            CommandResponse::error(msg, code)
        }
        Ok(CommandExit::Signaled) => {
            let msg = "command terminated by signal";
            note_failure(writer, msg);
            CommandResponse::error(msg, FALLBACK_EXIT_CODE)
        }
        Err(err) => {
            if matches!(err, BridgeError::Launch(_)) {
                info!(command = %req.command, error = %err, "command never ran");
            }
            let msg = err.to_string();
            note_failure(writer, &msg);
            CommandResponse::error(msg, FALLBACK_EXIT_CODE)
        }
    }
}

/// Record why the command failed as a channel line, right before the marker,
/// so a follower shows the reason alongside the output.
fn note_failure(writer: &mut ChannelWriter, msg: &str) {
    if let Err(err) = writer.write_line(&format!("Command failed: {msg}")) {
        warn!(error = %err, "failed to write failure line into log channel");
    }
}

/// Channel path for a request: the one the sender chose, or a server-local
/// default when none was supplied.
///
/// The default file is left on disk after the request so the output stays
/// inspectable; its path is logged.
fn resolve_channel_path(req: &CommandRequest) -> Result<PathBuf> {
    if !req.log_file_path.is_empty() {
        return Ok(PathBuf::from(&req.log_file_path));
    }

    let temp = tempfile::Builder::new()
        .prefix("cmdbridge-server-")
        .suffix(".log")
        .tempfile()?;
    let (_file, path) = temp.keep().map_err(|err| {
        BridgeError::Channel(format!("failed to persist default log channel: {err}"))
    })?;
    info!(path = %path.display(), "no log channel in request; using server-local default");
    Ok(path)
}
