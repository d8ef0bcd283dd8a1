// src/types.rs

//! Wire types shared between server and sender.
//!
//! Field names follow the JSON envelope of the `/cmd` endpoint:
//! `command`, `working_directory`, `log_file_path`, `environments` on the
//! request side; `status`, `msg`, `exit_code` on the response side.

use serde::{Deserialize, Serialize};

/// Exit code reported when an error occurred but no real process exit code
/// is available (launch failure, signal termination, transport failure).
pub const FALLBACK_EXIT_CODE: i32 = 1;

/// One environment variable to set for the bridged command.
///
/// Keys need not be unique across a request; when merged into the child
/// environment, later pairs shadow earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvPair {
    pub key: String,
    pub value: String,
}

impl EnvPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A command execution request, immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Shell snippet to run (pipes, redirection, expansion all honored).
    pub command: String,

    /// Working directory for the command; empty means "server's cwd".
    #[serde(default)]
    pub working_directory: String,

    /// Path of the log channel the server writes combined output into.
    ///
    /// Chosen by the sender so that it can follow the same file.
    #[serde(default)]
    pub log_file_path: String,

    /// Environment overlay applied on top of the server's environment.
    #[serde(default)]
    pub environments: Vec<EnvPair>,
}

/// Overall outcome of a bridged command, as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Ok => "ok",
            ResponseStatus::Error => "error",
        }
    }
}

/// Response envelope for `/cmd` and `/ping`.
///
/// Produced exactly once per request, after the underlying process has fully
/// terminated or failed to launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub status: ResponseStatus,
    pub msg: String,
    pub exit_code: i32,
}

impl CommandResponse {
    /// Successful response; `exit_code` is always 0.
    pub fn ok(msg: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Ok,
            msg: msg.into(),
            exit_code: 0,
        }
    }

    /// Error response carrying the best available exit code.
    ///
    /// Callers pass the real process exit code when one exists, or
    /// [`FALLBACK_EXIT_CODE`] when it does not.
    pub fn error(msg: impl Into<String>, exit_code: i32) -> Self {
        Self {
            status: ResponseStatus::Error,
            msg: msg.into(),
            exit_code,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}
