// tests/bridge_end_to_end.rs

//! Sender ↔ server round trips over real HTTP on an ephemeral port.

use cmdbridge::client::{BridgeConfig, bridge_env_from_vars, send_command, send_command_with};
use cmdbridge::types::{CommandResponse, EnvPair, FALLBACK_EXIT_CODE, ResponseStatus};
use cmdbridge_test_utils::{init_tracing, spawn_bridge_server};

fn config(server_url: String, command: &str) -> BridgeConfig {
    BridgeConfig {
        server_url,
        command: command.to_string(),
        working_directory: None,
        environments: vec![],
    }
}

#[tokio::test]
async fn test_successful_command_reports_exit_zero() {
    init_tracing();
    let addr = spawn_bridge_server().await.unwrap();

    let code = send_command(config(format!("http://{addr}"), "echo hello"))
        .await
        .unwrap();

    assert_eq!(code, 0);
}

#[tokio::test]
async fn test_output_is_relayed_to_the_caller() {
    init_tracing();
    let addr = spawn_bridge_server().await.unwrap();

    let mut lines = Vec::new();
    let code = send_command_with(config(format!("http://{addr}"), "echo hello"), |line| {
        lines.push(line.to_string());
    })
    .await
    .unwrap();

    assert_eq!(code, 0);
    assert_eq!(lines, vec!["hello".to_string()]);
}

#[tokio::test]
async fn test_multi_line_output_arrives_in_order() {
    init_tracing();
    let addr = spawn_bridge_server().await.unwrap();

    let mut lines = Vec::new();
    let code = send_command_with(
        config(
            format!("http://{addr}"),
            "for i in 1 2 3 4 5; do echo line$i; done",
        ),
        |line| lines.push(line.to_string()),
    )
    .await
    .unwrap();

    assert_eq!(code, 0);
    let expected: Vec<String> = (1..=5).map(|i| format!("line{i}")).collect();
    assert_eq!(lines, expected);
}

#[tokio::test]
async fn test_failure_reason_is_relayed_with_the_output() {
    init_tracing();
    let addr = spawn_bridge_server().await.unwrap();

    let mut lines = Vec::new();
    let code = send_command_with(
        config(format!("http://{addr}"), "echo partial; exit 9"),
        |line| lines.push(line.to_string()),
    )
    .await
    .unwrap();

    assert_eq!(code, 9);
    assert_eq!(lines[0], "partial");
    assert!(
        lines
            .iter()
            .any(|l| l.contains("Command failed: command exited with code 9")),
        "lines: {lines:?}"
    );
}

#[tokio::test]
async fn test_remote_exit_code_is_propagated() {
    init_tracing();
    let addr = spawn_bridge_server().await.unwrap();

    let code = send_command(config(format!("http://{addr}"), "exit 7"))
        .await
        .unwrap();

    assert_eq!(code, 7);
}

#[tokio::test]
async fn test_environment_overlay_travels_through_the_bridge() {
    init_tracing();
    let addr = spawn_bridge_server().await.unwrap();

    let mut cfg = config(format!("http://{addr}"), "test \"$FOO\" = \"bar\"");
    cfg.environments = vec![EnvPair::new("FOO", "bar")];

    let code = send_command(cfg).await.unwrap();
    assert_eq!(code, 0);
}

#[tokio::test]
async fn test_working_directory_travels_through_the_bridge() {
    init_tracing();
    let addr = spawn_bridge_server().await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let marker = dir.path().join("was-here");
    let mut cfg = config(format!("http://{addr}"), "touch was-here");
    cfg.working_directory = Some(dir.path().to_str().unwrap().to_string());

    let code = send_command(cfg).await.unwrap();
    assert_eq!(code, 0);
    assert!(marker.exists());
}

#[tokio::test]
async fn test_unreachable_server_maps_to_fallback_code() {
    init_tracing();

    // Grab a port that nothing is listening on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let code = send_command(config(format!("http://{addr}"), "echo unreachable"))
        .await
        .unwrap();

    // Transport failure must never be mistaken for exit 0.
    assert_eq!(code, FALLBACK_EXIT_CODE);
}

#[tokio::test]
async fn test_ping_round_trip() {
    init_tracing();
    let addr = spawn_bridge_server().await.unwrap();

    let resp = reqwest::get(format!("http://{addr}/ping")).await.unwrap();
    assert!(resp.status().is_success());

    let body: CommandResponse = resp.json().await.unwrap();
    assert_eq!(body.status, ResponseStatus::Ok);
    assert_eq!(body.msg, "pong");
    assert_eq!(body.exit_code, 0);
}

#[tokio::test]
async fn test_malformed_request_gets_error_envelope() {
    init_tracing();
    let addr = spawn_bridge_server().await.unwrap();

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/cmd"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let body: CommandResponse = resp.json().await.unwrap();
    assert_eq!(body.status, ResponseStatus::Error);
    assert_eq!(body.exit_code, FALLBACK_EXIT_CODE);
    assert!(body.msg.contains("invalid request"));
}

#[test]
fn test_bridge_env_harvest_strips_the_prefix() {
    let vars = vec![
        ("_CMDENV__FOO".to_string(), "bar".to_string()),
        ("UNRELATED".to_string(), "nope".to_string()),
        ("_CMDENV__EMPTY".to_string(), String::new()),
    ];

    let pairs = bridge_env_from_vars(vars.into_iter());

    assert!(pairs.contains(&EnvPair::new("FOO", "bar")));
    assert!(pairs.contains(&EnvPair::new("EMPTY", "")));
    assert_eq!(pairs.len(), 2);
}
