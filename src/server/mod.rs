// src/server/mod.rs

//! HTTP server side of the bridge.
//!
//! A thin axum app over the dispatch orchestrator:
//! - `POST /cmd`: run a command request, respond with the result envelope.
//! - `GET /ping`: liveness check, responds with `pong`.
//!
//! Requests are handled independently and concurrently; the only state
//! shared between them is the open-channel registry.

pub mod dispatch;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use crate::errors::Result;
use crate::relay::{ChannelRegistry, new_registry};
use crate::types::{CommandRequest, CommandResponse, FALLBACK_EXIT_CODE, ResponseStatus};

pub use dispatch::dispatch;

/// Shared state of one running server.
#[derive(Clone)]
pub struct AppState {
    /// Paths of channels currently open for writing.
    pub channels: ChannelRegistry,
    /// Echo each received command into its log channel before running it.
    pub echo_command: bool,
}

impl AppState {
    pub fn new(echo_command: bool) -> Self {
        Self {
            channels: new_registry(),
            echo_command,
        }
    }
}

/// Build the bridge router. Separate from [`serve`] so tests can drive the
/// app on an ephemeral port.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/cmd", post(cmd_handler))
        .route("/ping", get(ping_handler))
        .with_state(state)
}

/// Bind `addr` and serve the bridge until the process is stopped.
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "cmdbridge server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn ping_handler() -> Response {
    info!("ping received");
    respond(CommandResponse::ok("pong"))
}

async fn cmd_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CommandRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            return respond(CommandResponse::error(
                format!("invalid request: {rejection}"),
                FALLBACK_EXIT_CODE,
            ));
        }
    };

    info!(command = %req.command, log_channel = %req.log_file_path, "command received");
    respond(dispatch(&state.channels, &req, state.echo_command).await)
}

/// Map the result envelope onto an HTTP status: 200 for ok, 400 for error.
fn respond(resp: CommandResponse) -> Response {
    let code = match resp.status {
        ResponseStatus::Ok => StatusCode::OK,
        ResponseStatus::Error => StatusCode::BAD_REQUEST,
    };
    (code, Json(resp)).into_response()
}
