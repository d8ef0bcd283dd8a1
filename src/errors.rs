// src/errors.rs

//! Crate-wide error type and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The command could not be started at all (missing shell, bad working
    /// directory, permission denied). Distinct from a nonzero exit code:
    /// carrying this error means the process never ran.
    #[error("Launch error: {0}")]
    Launch(String),

    /// The log channel could not be opened, written or followed.
    #[error("Log channel error: {0}")]
    Channel(String),

    /// The RPC call to the server failed at the network or protocol level.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BridgeError>;
