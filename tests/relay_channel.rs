// tests/relay_channel.rs

//! Writer side of the log relay: flush-on-write, idempotent close, and the
//! one-open-channel-per-path invariant.

use cmdbridge::errors::BridgeError;
use cmdbridge::exec::LineSink;
use cmdbridge::relay::{ChannelWriter, new_registry};

#[test]
fn test_lines_are_visible_immediately_after_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chan.log");
    let registry = new_registry();

    let mut writer = ChannelWriter::open(&registry, &path).unwrap();
    writer.write_line("first").unwrap();

    // Flush-on-write: readable before the channel is closed.
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\n");

    writer.write_line("second").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
}

#[test]
fn test_open_truncates_existing_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chan.log");
    std::fs::write(&path, "stale content\n").unwrap();

    let registry = new_registry();
    let writer = ChannelWriter::open(&registry, &path).unwrap();
    drop(writer);

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_close_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chan.log");
    let registry = new_registry();

    let mut writer = ChannelWriter::open(&registry, &path).unwrap();
    writer.write_line("only line").unwrap();
    writer.close();
    writer.close(); // no-op, not an error
}

#[test]
fn test_write_after_close_is_a_channel_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chan.log");
    let registry = new_registry();

    let mut writer = ChannelWriter::open(&registry, &path).unwrap();
    writer.close();

    match writer.write_line("too late") {
        Err(BridgeError::Channel(msg)) => assert!(msg.contains("closed")),
        other => panic!("expected Channel error, got {other:?}"),
    }
}

#[test]
fn test_colliding_open_fails_while_channel_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chan.log");
    let registry = new_registry();

    let _writer = ChannelWriter::open(&registry, &path).unwrap();

    match ChannelWriter::open(&registry, &path) {
        Err(BridgeError::Channel(msg)) => assert!(msg.contains("already open")),
        other => panic!("expected Channel error, got {other:?}"),
    }
}

#[test]
fn test_path_is_reusable_after_close() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chan.log");
    let registry = new_registry();

    let mut writer = ChannelWriter::open(&registry, &path).unwrap();
    writer.close();

    let second = ChannelWriter::open(&registry, &path);
    assert!(second.is_ok());
}

#[test]
fn test_drop_releases_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chan.log");
    let registry = new_registry();

    {
        let _writer = ChannelWriter::open(&registry, &path).unwrap();
    }

    assert!(ChannelWriter::open(&registry, &path).is_ok());
}

#[test]
fn test_unwritable_location_is_a_channel_error() {
    let registry = new_registry();

    match ChannelWriter::open(&registry, "/no/such/dir/chan.log") {
        Err(BridgeError::Channel(msg)) => assert!(msg.contains("failed to create")),
        other => panic!("expected Channel error, got {other:?}"),
    }

    // The failed open must not leave the path registered.
    assert!(registry.lock().unwrap().is_empty());
}
