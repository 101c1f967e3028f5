// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Self-healing diagnostics stream client.
//!
//! ```text
//!            ┌──────────── backoff ◀──────────────┐
//!            ▼                                    │
//!   Disconnected ──▶ Connecting ──▶ Streaming ────┘ (EOF / read error)
//!                        │ endpoint missing
//!                        └──▶ backoff, no error raised
//! ```
//!
//! One worker thread owns the socket. Parsed frames, state changes and
//! errors are handed to the consumer over a `crossbeam-channel` sender.

use crate::decoder::FrameDecoder;
use crate::{ChannelError, DiagnosticsFrame};
use crossbeam_channel::Sender;
use std::io::{ErrorKind, Read};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Default diagnostics endpoint.
pub const DEFAULT_ENDPOINT: &str = "/tmp/tcmt_diag.sock";

/// Size of a single socket read; a read shorter than this ends a document.
pub const READ_CHUNK: usize = 4096;

/// Connection state of the client worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Streaming,
}

/// Something the worker wants the consumer to know.
#[derive(Debug)]
pub enum ChannelEvent {
    Frame(DiagnosticsFrame),
    StateChanged(ChannelState),
    Error(ChannelError),
}

/// Timing knobs for the client worker.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: PathBuf,
    /// Wait between connection attempts and after a disconnect.
    pub reconnect_backoff: Duration,
    /// How long one connection attempt waits for the endpoint to appear.
    pub connect_timeout: Duration,
    /// Poll interval while waiting for the endpoint.
    pub connect_poll: Duration,
    /// Socket read timeout; bounds how long `stop()` waits for the worker.
    pub read_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: PathBuf::from(DEFAULT_ENDPOINT),
            reconnect_backoff: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(3),
            connect_poll: Duration::from_millis(100),
            read_timeout: Duration::from_millis(200),
        }
    }
}

/// Background client for the diagnostics endpoint.
pub struct ChannelClient {
    config: ClientConfig,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<ChannelState>>,
    worker: Option<JoinHandle<()>>,
}

impl ChannelClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(ChannelState::Disconnected)),
            worker: None,
        }
    }

    /// Spawns the worker. Events go to `sink` until [`stop`](Self::stop)
    /// is called or the receiving side is dropped.
    pub fn start(&mut self, sink: Sender<ChannelEvent>) -> Result<(), ChannelError> {
        if self.worker.is_some() {
            return Err(ChannelError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);
        let worker = Worker {
            config: self.config.clone(),
            running: Arc::clone(&self.running),
            state: Arc::clone(&self.state),
            sink,
        };
        let handle = std::thread::Builder::new()
            .name("diag-channel".into())
            .spawn(move || worker.run())
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                ChannelError::Spawn(e)
            })?;
        self.worker = Some(handle);
        tracing::info!(
            "diagnostics client: started for {}",
            self.config.endpoint.display()
        );
        Ok(())
    }

    /// Signals the worker and waits for it to exit. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("diagnostics client: worker panicked");
            }
            tracing::info!("diagnostics client: stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some() && self.running.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ChannelState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn endpoint(&self) -> &Path {
        &self.config.endpoint
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ChannelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelClient")
            .field("endpoint", &self.config.endpoint)
            .field("running", &self.is_running())
            .field("state", &self.state())
            .finish()
    }
}

// ── Worker ─────────────────────────────────────────────────────

/// Outcome of one connection attempt.
enum Connect {
    Connected(UnixStream),
    Unavailable,
}

struct Worker {
    config: ClientConfig,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<ChannelState>>,
    sink: Sender<ChannelEvent>,
}

impl Worker {
    fn run(self) {
        while self.is_running() {
            self.set_state(ChannelState::Connecting);
            match self.connect() {
                Ok(Connect::Connected(stream)) => {
                    tracing::info!(
                        "diagnostics client: connected to {}",
                        self.config.endpoint.display()
                    );
                    self.set_state(ChannelState::Streaming);
                    self.stream(stream);
                }
                Ok(Connect::Unavailable) => {
                    tracing::debug!(
                        "diagnostics client: {} not available",
                        self.config.endpoint.display()
                    );
                }
                Err(e) => self.emit(ChannelEvent::Error(e)),
            }
            self.set_state(ChannelState::Disconnected);
            self.pause(self.config.reconnect_backoff);
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sleeps in short steps so that `stop()` is not held up by a backoff.
    fn pause(&self, total: Duration) {
        let step = Duration::from_millis(20);
        let deadline = Instant::now() + total;
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(step.min(deadline - now));
        }
    }

    fn set_state(&self, next: ChannelState) {
        let changed = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let changed = *state != next;
            *state = next;
            changed
        };
        if changed {
            self.emit(ChannelEvent::StateChanged(next));
        }
    }

    /// Sends an event; a dropped receiver stops the worker.
    fn emit(&self, event: ChannelEvent) {
        if self.sink.send(event).is_err() {
            tracing::debug!("diagnostics client: receiver dropped, stopping");
            self.running.store(false, Ordering::SeqCst);
        }
    }

    fn transport_error(&self, source: std::io::Error) -> ChannelError {
        ChannelError::Transport {
            endpoint: self.config.endpoint.display().to_string(),
            source,
        }
    }

    /// Waits for the endpoint to appear, then connects.
    fn connect(&self) -> Result<Connect, ChannelError> {
        let deadline = Instant::now() + self.config.connect_timeout;
        while !self.config.endpoint.exists() {
            if !self.is_running() || Instant::now() >= deadline {
                return Ok(Connect::Unavailable);
            }
            std::thread::sleep(self.config.connect_poll);
        }

        match UnixStream::connect(&self.config.endpoint) {
            Ok(stream) => {
                stream
                    .set_read_timeout(Some(self.config.read_timeout))
                    .map_err(|e| self.transport_error(e))?;
                Ok(Connect::Connected(stream))
            }
            // A stale socket file with no listener behind it.
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::ConnectionRefused) => {
                Ok(Connect::Unavailable)
            }
            Err(e) => Err(self.transport_error(e)),
        }
    }

    /// Reads until EOF, a transport error or `stop()`.
    fn stream(&self, mut stream: UnixStream) {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; READ_CHUNK];

        while self.is_running() {
            match stream.read(&mut buf) {
                Ok(0) => {
                    tracing::info!("diagnostics client: peer closed the stream");
                    return;
                }
                Ok(n) => {
                    decoder.push(&buf[..n]);
                    if let Some(e) = decoder.enforce_limit() {
                        tracing::warn!("diagnostics client: dropping oversized document: {e}");
                        self.emit(ChannelEvent::Error(e));
                        continue;
                    }
                    if n < buf.len() {
                        self.deliver(&mut decoder);
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    // Idle: whatever was buffered is as complete as it gets.
                    if decoder.pending_len() > 0 {
                        self.deliver(&mut decoder);
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("diagnostics client: read failed: {e}");
                    self.emit(ChannelEvent::Error(self.transport_error(e)));
                    return;
                }
            }
        }
    }

    fn deliver(&self, decoder: &mut FrameDecoder) {
        for item in decoder.drain() {
            match item {
                Ok(frame) => self.emit(ChannelEvent::Frame(frame)),
                Err(e) => {
                    tracing::warn!("diagnostics client: dropping frame: {e}");
                    self.emit(ChannelEvent::Error(e));
                }
            }
        }
    }
}
