pub mod builders;

use std::net::SocketAddr;
use std::sync::Once;

use cmdbridge::server::{AppState, build_app};
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Start a bridge server on an ephemeral port, returning its address.
///
/// The server task runs until the test's runtime shuts down.
pub async fn spawn_bridge_server() -> anyhow::Result<SocketAddr> {
    spawn_bridge_server_with(AppState::new(false)).await
}

/// Like [`spawn_bridge_server`] but with caller-controlled state.
pub async fn spawn_bridge_server_with(state: AppState) -> anyhow::Result<SocketAddr> {
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(error = %err, "test bridge server stopped");
        }
    });
    Ok(addr)
}
