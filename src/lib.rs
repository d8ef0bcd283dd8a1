// src/lib.rs

pub mod cli;
pub mod client;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod relay;
pub mod server;
pub mod types;

use tracing::info;

use crate::cli::CliArgs;
use crate::client::BridgeConfig;
use crate::errors::Result;
use crate::server::AppState;

/// High-level entry point used by `main.rs`.
///
/// Without `--do`, starts the bridge server and blocks until it is stopped.
/// With `--do CMD`, bridges the command through an already running server
/// and returns the exit code this process should exit with.
pub async fn run(args: CliArgs) -> Result<i32> {
    match args.do_command {
        Some(command) => {
            let cfg = BridgeConfig {
                server_url: format!("http://127.0.0.1:{}", args.port),
                command,
                working_directory: args.workdir,
                environments: client::collect_bridge_env(),
            };
            client::send_command(cfg).await
        }
        None => {
            info!(port = args.port, "no command specified; starting server");
            let state = AppState::new(args.echo_command);
            server::serve(&format!("127.0.0.1:{}", args.port), state).await?;
            Ok(0)
        }
    }
}
