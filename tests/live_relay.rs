// tests/live_relay.rs

//! The full server-side pipeline observed live: a follower attached while a
//! command is still running sees every output line in emission order,
//! followed by the end-marker, before being stopped.

use cmdbridge::relay::{TailFollower, is_end_marker, new_registry};
use cmdbridge::server::dispatch;
use cmdbridge::types::ResponseStatus;
use cmdbridge_test_utils::builders::CommandRequestBuilder;
use cmdbridge_test_utils::{init_tracing, with_timeout};

#[tokio::test]
async fn test_follower_sees_lines_in_order_then_marker() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chan.log");
    let registry = new_registry();

    // Slow producer so the follower genuinely tails a growing file.
    let req = CommandRequestBuilder::new(
        "for i in 1 2 3 4; do echo line$i; sleep 0.05; done",
    )
    .log_channel(path.to_str().unwrap())
    .build();

    let reg = registry.clone();
    let server = tokio::spawn(async move { dispatch(&reg, &req, false).await });

    // Attach while (or just before) the command runs; the follower tolerates
    // the file not existing yet.
    let mut follower = TailFollower::follow(&path, true);

    let mut seen = Vec::new();
    loop {
        let line = with_timeout(follower.next_line())
            .await
            .expect("channel ended before the marker");
        if is_end_marker(&line) {
            assert_eq!(line, "[[cmdbridge-finished]]: ok");
            break;
        }
        seen.push(line);
    }
    follower.stop();

    let expected: Vec<String> = (1..=4).map(|i| format!("line{i}")).collect();
    assert_eq!(seen, expected);

    let resp = server.await.unwrap();
    assert_eq!(resp.status, ResponseStatus::Ok);
    assert_eq!(resp.exit_code, 0);
}

#[tokio::test]
async fn test_fast_command_output_survives_immediate_stop() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chan.log");
    let registry = new_registry();

    let req = CommandRequestBuilder::new("echo hello")
        .log_channel(path.to_str().unwrap())
        .build();

    // The command completes before the follower polls even once.
    let resp = dispatch(&registry, &req, false).await;
    assert_eq!(resp.status, ResponseStatus::Ok);

    let mut follower = TailFollower::follow(&path, true);
    follower.stop();

    let mut lines = Vec::new();
    while let Some(line) = with_timeout(follower.next_line()).await {
        lines.push(line);
    }

    assert_eq!(lines.len(), 2, "lines: {lines:?}");
    assert_eq!(lines[0], "hello");
    assert!(is_end_marker(&lines[1]));
}
