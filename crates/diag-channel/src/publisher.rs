// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Producer-side diagnostics endpoint.
//!
//! [`DiagnosticsPublisher`] binds the Unix socket, accepts one client at a
//! time and writes one [`DiagnosticsFrame`] per interval. Log lines queued
//! with [`append_log`](DiagnosticsPublisher::append_log) are drained into
//! the next frame.

use crate::{ChannelError, DiagnosticsFrame};
use std::collections::VecDeque;
use std::io::{ErrorKind, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Upper bound on queued log lines; the oldest are dropped first.
const MAX_QUEUED_LOGS: usize = 1000;

/// Supplies the snapshot echo fields for each frame.
pub type FrameSource = dyn Fn() -> DiagnosticsFrame + Send + Sync;

/// Serves diagnostics frames on a Unix domain socket.
pub struct DiagnosticsPublisher {
    path: PathBuf,
    running: Arc<AtomicBool>,
    logs: Arc<Mutex<VecDeque<String>>>,
    worker: Option<JoinHandle<()>>,
}

impl DiagnosticsPublisher {
    /// Binds `path` (replacing a stale socket file) and starts serving.
    ///
    /// `source` is called once per frame; its `timestamp`, `offsets`,
    /// `expected_size` and `logs` are overwritten by the publisher.
    pub fn start(
        path: impl Into<PathBuf>,
        interval: Duration,
        source: Box<FrameSource>,
    ) -> Result<Self, ChannelError> {
        let path = path.into();
        let transport = |source| ChannelError::Transport {
            endpoint: path.display().to_string(),
            source,
        };
        if path.exists() {
            std::fs::remove_file(&path).map_err(transport)?;
        }
        let listener = UnixListener::bind(&path).map_err(transport)?;
        listener.set_nonblocking(true).map_err(transport)?;

        let running = Arc::new(AtomicBool::new(true));
        let logs = Arc::new(Mutex::new(VecDeque::new()));
        let server = Server {
            listener,
            interval,
            source,
            running: Arc::clone(&running),
            logs: Arc::clone(&logs),
        };
        let worker = std::thread::Builder::new()
            .name("diag-publisher".into())
            .spawn(move || server.run())
            .map_err(ChannelError::Spawn)?;
        tracing::info!("diagnostics publisher: listening on {}", path.display());

        Ok(Self {
            path,
            running,
            logs,
            worker: Some(worker),
        })
    }

    /// Queues a log line for the next frame.
    pub fn append_log(&self, line: impl Into<String>) {
        let mut logs = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        if logs.len() >= MAX_QUEUED_LOGS {
            logs.pop_front();
        }
        logs.push_back(line.into());
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stops serving, joins the worker and removes the socket file.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("diagnostics publisher: worker panicked");
            }
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        "diagnostics publisher: cannot remove {}: {e}",
                        self.path.display()
                    );
                }
            }
            tracing::info!("diagnostics publisher: stopped");
        }
    }
}

impl Drop for DiagnosticsPublisher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for DiagnosticsPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticsPublisher")
            .field("path", &self.path)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

// ── Server loop ────────────────────────────────────────────────

struct Server {
    listener: UnixListener,
    interval: Duration,
    source: Box<FrameSource>,
    running: Arc<AtomicBool>,
    logs: Arc<Mutex<VecDeque<String>>>,
}

impl Server {
    fn run(self) {
        let mut client: Option<UnixStream> = None;
        while self.running.load(Ordering::SeqCst) {
            if client.is_none() {
                client = self.accept();
            }
            if let Some(stream) = client.as_mut() {
                if let Err(e) = self.send_frame(stream) {
                    tracing::debug!("diagnostics publisher: client dropped: {e}");
                    client = None;
                    continue;
                }
                self.sleep(self.interval);
            } else {
                self.sleep(Duration::from_millis(50));
            }
        }
    }

    fn accept(&self) -> Option<UnixStream> {
        match self.listener.accept() {
            Ok((stream, _)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    tracing::warn!("diagnostics publisher: cannot configure client: {e}");
                    return None;
                }
                tracing::info!("diagnostics publisher: client connected");
                Some(stream)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => None,
            Err(e) => {
                tracing::warn!("diagnostics publisher: accept failed: {e}");
                None
            }
        }
    }

    fn next_frame(&self) -> DiagnosticsFrame {
        let mut frame = (self.source)().with_layout_offsets();
        frame.timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut logs = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        frame.logs = logs.drain(..).collect();
        frame
    }

    fn send_frame(&self, stream: &mut UnixStream) -> std::io::Result<()> {
        let frame = self.next_frame();
        let json = frame
            .to_json()
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        stream.write_all(json.as_bytes())?;
        stream.flush()
    }

    fn sleep(&self, total: Duration) {
        let step = Duration::from_millis(20);
        let mut left = total;
        while !left.is_zero() && self.running.load(Ordering::SeqCst) {
            let d = step.min(left);
            std::thread::sleep(d);
            left -= d;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_publishes_frames_with_logs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.sock");
        let source: Box<FrameSource> = Box::new(|| DiagnosticsFrame {
            write_sequence: 8,
            ..Default::default()
        });
        let mut publisher =
            DiagnosticsPublisher::start(&path, Duration::from_millis(20), source).unwrap();
        publisher.append_log("hello");

        let mut stream = UnixStream::connect(&path).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).unwrap();
        let frame: DiagnosticsFrame = serde_json::Deserializer::from_slice(&buf[..n])
            .into_iter()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(frame.write_sequence, 8);
        assert_eq!(frame.logs, vec!["hello"]);
        assert_eq!(frame.expected_size, 3212);
        assert!(frame.timestamp > 0);

        publisher.stop();
        assert!(!path.exists());
    }

    #[test]
    fn test_log_queue_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let source: Box<FrameSource> = Box::new(DiagnosticsFrame::default);
        let publisher =
            DiagnosticsPublisher::start(dir.path().join("q.sock"), Duration::from_secs(1), source)
                .unwrap();
        for i in 0..(MAX_QUEUED_LOGS + 5) {
            publisher.append_log(format!("line {i}"));
        }
        let logs = publisher.logs.lock().unwrap();
        assert_eq!(logs.len(), MAX_QUEUED_LOGS);
        assert_eq!(logs.front().map(String::as_str), Some("line 5"));
    }
}
