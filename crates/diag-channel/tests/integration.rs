// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: client and publisher over a real Unix socket.

use diag_channel::{
    ChannelClient, ChannelEvent, ChannelState, ClientConfig, DiagnosticsFrame,
    DiagnosticsPublisher, FrameSource,
};
use std::io::Write;
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::time::{Duration, Instant};

// ── Helpers ────────────────────────────────────────────────────

fn fast_config(endpoint: PathBuf) -> ClientConfig {
    ClientConfig {
        endpoint,
        reconnect_backoff: Duration::from_millis(30),
        connect_timeout: Duration::from_millis(100),
        connect_poll: Duration::from_millis(10),
        read_timeout: Duration::from_millis(20),
    }
}

/// Collects events until `pred` matches one, or panics after `timeout`.
fn wait_for<F>(rx: &crossbeam_channel::Receiver<ChannelEvent>, timeout: Duration, pred: F) -> ChannelEvent
where
    F: Fn(&ChannelEvent) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(ev) if pred(&ev) => return ev,
            Ok(_) => continue,
            Err(_) => panic!("timed out waiting for event"),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[test]
fn test_client_receives_published_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diag.sock");
    let source: Box<FrameSource> = Box::new(|| DiagnosticsFrame {
        write_sequence: 12,
        abi_version: 0x0001_0014,
        ..Default::default()
    });
    let publisher = DiagnosticsPublisher::start(&path, Duration::from_millis(20), source).unwrap();
    publisher.append_log("sensor scan complete");

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut client = ChannelClient::new(fast_config(path.clone()));
    client.start(tx).unwrap();

    let ev = wait_for(&rx, Duration::from_secs(5), |e| {
        matches!(e, ChannelEvent::Frame(f) if !f.logs.is_empty())
    });
    match ev {
        ChannelEvent::Frame(frame) => {
            assert_eq!(frame.write_sequence, 12);
            assert_eq!(frame.logs, vec!["sensor scan complete"]);
            assert!(frame.layout_mismatches().is_empty());
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(client.state(), ChannelState::Streaming);
    client.stop();
}

#[test]
fn test_client_waits_for_late_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("late.sock");

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut client = ChannelClient::new(fast_config(path.clone()));
    client.start(tx).unwrap();
    std::thread::sleep(Duration::from_millis(150));

    let source: Box<FrameSource> = Box::new(DiagnosticsFrame::default);
    let _publisher = DiagnosticsPublisher::start(&path, Duration::from_millis(20), source).unwrap();
    wait_for(&rx, Duration::from_secs(5), |e| matches!(e, ChannelEvent::Frame(_)));
    client.stop();
}

#[test]
fn test_parse_error_does_not_stop_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.sock");
    let listener = UnixListener::bind(&path).unwrap();

    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(b"{not json").unwrap();
        std::thread::sleep(Duration::from_millis(100));
        stream.write_all(br#"{"writeSequence":7,"logs":["boot ok"]}"#).unwrap();
        std::thread::sleep(Duration::from_millis(200));
    });

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut client = ChannelClient::new(fast_config(path));
    client.start(tx).unwrap();

    wait_for(&rx, Duration::from_secs(5), |e| matches!(e, ChannelEvent::Error(_)));
    let ev = wait_for(&rx, Duration::from_secs(5), |e| matches!(e, ChannelEvent::Frame(_)));
    if let ChannelEvent::Frame(frame) = ev {
        assert_eq!(frame.write_sequence, 7);
        assert_eq!(frame.logs, vec!["boot ok"]);
    }
    server.join().unwrap();
    client.stop();
}

#[test]
fn test_unterminated_flood_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flood.sock");
    let listener = UnixListener::bind(&path).unwrap();

    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(b"{\"logs\":[\"").unwrap();
        let chunk = vec![b'a'; 16 * 1024];
        for _ in 0..(4 * diag_channel::MAX_PENDING_BYTES / chunk.len()) {
            if stream.write_all(&chunk).is_err() {
                return;
            }
        }
        stream.write_all(b"\"]}").unwrap();
        std::thread::sleep(Duration::from_millis(100));
        stream.write_all(br#"{"writeSequence":11}"#).unwrap();
        std::thread::sleep(Duration::from_millis(200));
    });

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut client = ChannelClient::new(fast_config(path));
    client.start(tx).unwrap();

    let ev = wait_for(&rx, Duration::from_secs(5), |e| matches!(e, ChannelEvent::Error(_)));
    if let ChannelEvent::Error(e) = ev {
        assert!(e.to_string().contains("exceeds"), "{e}");
    }
    let ev = wait_for(&rx, Duration::from_secs(5), |e| matches!(e, ChannelEvent::Frame(_)));
    if let ChannelEvent::Frame(frame) = ev {
        assert_eq!(frame.write_sequence, 11);
    }
    server.join().unwrap();
    client.stop();
}

#[test]
fn test_peer_close_returns_to_disconnected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("close.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(br#"{"writeSequence":1}"#).unwrap();
    });

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut client = ChannelClient::new(fast_config(path));
    client.start(tx).unwrap();
    wait_for(&rx, Duration::from_secs(5), |e| matches!(e, ChannelEvent::Frame(_)));
    wait_for(&rx, Duration::from_secs(5), |e| {
        matches!(e, ChannelEvent::StateChanged(ChannelState::Disconnected))
    });
    server.join().unwrap();
    client.stop();
}
