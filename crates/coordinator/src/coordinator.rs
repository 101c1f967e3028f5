// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The update coordinator: one reader, one diagnostics client, one view.
//!
//! ```text
//!   caller ── poll() ──▶ SnapshotReader ──▶ current snapshot
//!                                   │ failure ×N
//!                                   ▼
//!                           connected = false
//!
//!   ChannelClient ──▶ crossbeam channel ──▶ frame pump ──▶ recent logs
//! ```
//!
//! The poll path and the frame pump run on different threads; everything
//! they share lives behind one mutex. Reads never happen under the lock.

use crate::{CoordinatorConfig, CoordinatorError, LogRing};
use crossbeam_channel::{Receiver, Sender};
use diag_channel::{ChannelClient, ChannelEvent, ChannelState, DiagnosticsFrame};
use snapshot_reader::{ReadStats, ReaderError, SnapshotReader, SystemSnapshot};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

/// Opens a fresh, validated reader. Called on start and on every reconnect.
pub type ReaderFactory = dyn Fn() -> Result<SnapshotReader, ReaderError> + Send + Sync;

/// Notifications for consumers that prefer push over polling the status.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum CoordinatorEvent {
    /// The connection status flipped.
    ConnectionChanged { connected: bool, reason: String },
    /// A poll replaced the current snapshot.
    DataUpdated {
        write_sequence: u32,
        snapshot_version: u32,
    },
    /// A poll or the diagnostics channel failed.
    Error(String),
    /// The producer's layout table disagrees with this build.
    LayoutMismatch(Vec<(String, usize, u64)>),
    /// The region's size or ABI version no longer matches this build.
    /// Polling and reconnecting stop until the next `start()`.
    Incompatible(String),
}

/// Point-in-time view of the coordinator, for display.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CoordinatorStatus {
    pub connected: bool,
    pub reason: String,
    pub consecutive_errors: u32,
    pub failure_threshold: u32,
    pub last_error: Option<String>,
    pub incompatible: Option<String>,
    pub region: Option<String>,
    pub channel: Option<ChannelState>,
    pub last_frame: Option<String>,
    pub log_count: usize,
    pub read_stats: Option<ReadStats>,
}

// ── Shared state ───────────────────────────────────────────────

struct State {
    current: Option<SystemSnapshot>,
    connected: bool,
    reason: String,
    consecutive_errors: u32,
    last_error: Option<String>,
    incompatible: Option<String>,
    last_frame: Option<String>,
    mismatches: Vec<(String, usize, u64)>,
    logs: LogRing,
    subscribers: Vec<Sender<CoordinatorEvent>>,
}

impl State {
    fn new(config: &CoordinatorConfig) -> Self {
        Self {
            current: None,
            connected: false,
            reason: "not started".into(),
            consecutive_errors: 0,
            last_error: None,
            incompatible: None,
            last_frame: None,
            mismatches: Vec::new(),
            logs: LogRing::new(config.log_capacity, config.log_trim_to),
            subscribers: Vec::new(),
        }
    }

    /// Sends to every live subscriber and forgets the dropped ones.
    fn notify(&mut self, event: CoordinatorEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn set_connected(&mut self, connected: bool, reason: String) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;
        self.reason = reason.clone();
        if connected {
            tracing::info!("connection status: {reason}");
        } else {
            tracing::warn!("connection status: {reason}");
        }
        self.notify(CoordinatorEvent::ConnectionChanged { connected, reason });
    }

    fn record_error(&mut self, message: String) {
        self.last_error = Some(message.clone());
        self.notify(CoordinatorEvent::Error(message));
    }

    fn mark_incompatible(&mut self, message: String) {
        tracing::error!("{message}; polling suspended");
        self.record_error(message.clone());
        self.incompatible = Some(message.clone());
        self.set_connected(false, format!("incompatible producer: {message}"));
        self.notify(CoordinatorEvent::Incompatible(message));
    }

    fn apply_frame(&mut self, frame: DiagnosticsFrame) {
        self.last_frame = Some(format!(
            "timestamp {}, write sequence {}, abi {:#010x}",
            frame.timestamp, frame.write_sequence, frame.abi_version
        ));

        if !frame.offsets.is_empty() || frame.expected_size != 0 {
            let mismatches = frame.layout_mismatches();
            if mismatches != self.mismatches {
                if !mismatches.is_empty() {
                    for (name, local, remote) in &mismatches {
                        tracing::warn!("layout mismatch: {name} is {remote} remotely, {local} locally");
                    }
                    self.notify(CoordinatorEvent::LayoutMismatch(mismatches.clone()));
                }
                self.mismatches = mismatches;
            }
        }

        for line in frame.logs {
            self.logs.push(line);
        }
    }
}

fn lock(shared: &Mutex<State>) -> MutexGuard<'_, State> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

// ── Coordinator ────────────────────────────────────────────────

/// Single source of truth for "is the producer reachable, and what did it
/// last publish".
pub struct UpdateCoordinator {
    config: CoordinatorConfig,
    factory: Box<ReaderFactory>,
    reader: Option<SnapshotReader>,
    shared: Arc<Mutex<State>>,
    client: Option<ChannelClient>,
    pump: Option<JoinHandle<()>>,
    running: bool,
}

impl UpdateCoordinator {
    /// Creates a coordinator that maps regions from `config.shm_dir`.
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoordinatorError> {
        config.validate()?;
        let locator = config.locator();
        let candidates = config.candidates()?;
        let policy = config.retry_policy();
        let factory = Box::new(move || {
            SnapshotReader::connect(&locator, &candidates).map(|r| r.with_policy(policy))
        });
        Self::with_reader_factory(config, factory)
    }

    /// Creates a coordinator that obtains readers from `factory`.
    pub fn with_reader_factory(
        config: CoordinatorConfig,
        factory: Box<ReaderFactory>,
    ) -> Result<Self, CoordinatorError> {
        config.validate()?;
        let shared = Arc::new(Mutex::new(State::new(&config)));
        Ok(Self {
            config,
            factory,
            reader: None,
            shared,
            client: None,
            pump: None,
            running: false,
        })
    }

    /// Registers for [`CoordinatorEvent`]s. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<CoordinatorEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        lock(&self.shared).subscribers.push(tx);
        rx
    }

    /// Connects and validates the reader, starts the diagnostics client and
    /// performs one poll.
    ///
    /// A reader failure is returned as is; [`CoordinatorError::is_abi_mismatch`]
    /// tells a version skew apart from a producer that is not running.
    pub fn start(&mut self) -> Result<(), CoordinatorError> {
        if self.running {
            return Ok(());
        }
        {
            let mut state = lock(&self.shared);
            state.consecutive_errors = 0;
            state.last_error = None;
            state.incompatible = None;
        }

        let reader = (self.factory)().map_err(|e| {
            let mut state = lock(&self.shared);
            state.reason = format!("snapshot region unavailable: {e}");
            state.record_error(format!("snapshot initialisation failed: {e}"));
            e
        })?;
        self.reader = Some(reader);

        if self.config.enable_diagnostics {
            if let Err(e) = self.start_diagnostics() {
                self.reader = None;
                lock(&self.shared).record_error(format!("diagnostics start failed: {e}"));
                return Err(e);
            }
        }

        self.running = true;
        tracing::info!("update coordinator started");
        self.poll();
        Ok(())
    }

    fn start_diagnostics(&mut self) -> Result<(), CoordinatorError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut client = ChannelClient::new(self.config.client_config());
        client.start(tx)?;

        let shared = Arc::clone(&self.shared);
        let pump = std::thread::Builder::new()
            .name("coordinator-pump".into())
            .spawn(move || pump_events(&shared, rx))
            .map_err(CoordinatorError::Spawn)?;

        self.client = Some(client);
        self.pump = Some(pump);
        Ok(())
    }

    /// Reads one snapshot and updates the connection status.
    ///
    /// Returns whether the read succeeded. On failure the previous snapshot
    /// stays current. A size or ABI mismatch is not retried: the reader is
    /// released and every later poll fails fast until the next `start()`.
    pub fn poll(&mut self) -> bool {
        if lock(&self.shared).incompatible.is_some() {
            return false;
        }
        let result = match self.reader.as_mut() {
            Some(reader) => reader.read_snapshot(),
            None => Err(ReaderError::NotConnected),
        };
        let threshold = self.config.failure_threshold;
        let region = self.region_label();

        let mut state = lock(&self.shared);
        match result {
            Ok(snapshot) => {
                let write_sequence = snapshot.write_sequence();
                let snapshot_version = snapshot.snapshot_version();
                tracing::trace!("poll ok: seq {write_sequence} v{snapshot_version}");
                state.current = Some(snapshot);
                state.consecutive_errors = 0;
                let reason = match region {
                    Some(label) => format!("connected to {label}"),
                    None => "connected".to_string(),
                };
                state.set_connected(true, reason);
                state.notify(CoordinatorEvent::DataUpdated {
                    write_sequence,
                    snapshot_version,
                });
                true
            }
            Err(e) if e.is_abi_mismatch() => {
                state.mark_incompatible(format!("snapshot read failed: {e}"));
                drop(state);
                if let Some(mut reader) = self.reader.take() {
                    reader.close();
                }
                false
            }
            Err(e) => {
                state.consecutive_errors = state.consecutive_errors.saturating_add(1);
                let message = format!("snapshot read failed: {e}");
                tracing::debug!(
                    "{message} ({}/{threshold})",
                    state.consecutive_errors
                );
                state.record_error(message.clone());
                if state.consecutive_errors >= threshold {
                    state.set_connected(false, format!("connection lost: {message}"));
                }
                false
            }
        }
    }

    /// Tears the reader down, opens a new one (re-validating the layout) and
    /// polls once. Returns whether that poll succeeded.
    ///
    /// Does nothing once the producer was found incompatible; check
    /// [`incompatibility`](Self::incompatibility) to tell that apart from a
    /// producer that is merely down.
    pub fn try_reconnect(&mut self) -> bool {
        if lock(&self.shared).incompatible.is_some() {
            tracing::debug!("reconnect skipped: producer is incompatible");
            return false;
        }
        tracing::info!("attempting to reconnect");
        lock(&self.shared).consecutive_errors = 0;

        if let Some(mut reader) = self.reader.take() {
            reader.close();
        }
        match (self.factory)() {
            Ok(reader) => {
                self.reader = Some(reader);
                let ok = self.poll();
                if ok {
                    tracing::info!("reconnection successful");
                }
                ok
            }
            Err(e) if e.is_abi_mismatch() => {
                lock(&self.shared).mark_incompatible(format!("reconnect failed: {e}"));
                false
            }
            Err(e) => {
                let mut state = lock(&self.shared);
                tracing::warn!("reconnection failed: {e}");
                state.record_error(format!("reconnect failed: {e}"));
                false
            }
        }
    }

    /// Applies a diagnostics frame as if it had arrived on the channel.
    pub fn ingest_frame(&self, frame: DiagnosticsFrame) {
        lock(&self.shared).apply_frame(frame);
    }

    /// The last successfully read snapshot. Never performs I/O.
    pub fn current_data(&self) -> Option<SystemSnapshot> {
        lock(&self.shared).current.clone()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.shared).connected
    }

    pub fn consecutive_errors(&self) -> u32 {
        lock(&self.shared).consecutive_errors
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.shared).last_error.clone()
    }

    /// Why the producer was judged incompatible, if it was. Cleared by `start()`.
    pub fn incompatibility(&self) -> Option<String> {
        lock(&self.shared).incompatible.clone()
    }

    /// `"Connected"` or `"Connection failed: <last error>"`.
    pub fn connection_status(&self) -> String {
        let state = lock(&self.shared);
        if state.connected {
            "Connected".to_string()
        } else {
            format!(
                "Connection failed: {}",
                state.last_error.as_deref().unwrap_or(&state.reason)
            )
        }
    }

    /// Recent diagnostic log lines, oldest first.
    pub fn recent_logs(&self) -> Vec<String> {
        lock(&self.shared).logs.to_vec()
    }

    /// Log lines received after `cursor`, with the next cursor. Start from `0`.
    pub fn logs_since(&self, cursor: u64) -> (Vec<String>, u64) {
        lock(&self.shared).logs.since(cursor)
    }

    /// Trims the log ring to its cleanup size. Returns how many lines were dropped.
    pub fn cleanup_logs(&self) -> usize {
        lock(&self.shared).logs.cleanup()
    }

    /// Offsets the producer last reported that disagree with this build.
    pub fn layout_mismatches(&self) -> Vec<(String, usize, u64)> {
        lock(&self.shared).mismatches.clone()
    }

    pub fn status(&self) -> CoordinatorStatus {
        let region = self.region_label();
        let channel = self.client.as_ref().map(ChannelClient::state);
        let read_stats = self.reader.as_ref().map(|r| r.stats().clone());
        let state = lock(&self.shared);
        CoordinatorStatus {
            connected: state.connected,
            reason: state.reason.clone(),
            consecutive_errors: state.consecutive_errors,
            failure_threshold: self.config.failure_threshold,
            last_error: state.last_error.clone(),
            incompatible: state.incompatible.clone(),
            region,
            channel,
            last_frame: state.last_frame.clone(),
            log_count: state.logs.len(),
            read_stats,
        }
    }

    /// Multi-line human-readable report of both links.
    pub fn diagnostic_info(&self) -> String {
        let status = self.status();
        let mut out = String::new();
        match (&status.region, &status.read_stats) {
            (Some(region), Some(stats)) => {
                out.push_str(&format!("Snapshot region: {region}\n"));
                out.push_str(&format!("Reads: {}\n", stats.summary()));
            }
            _ => out.push_str("Snapshot region: not connected\n"),
        }
        match status.channel {
            Some(state) => out.push_str(&format!("Diagnostics channel: {state:?}\n")),
            None => out.push_str("Diagnostics channel: disabled\n"),
        }
        if let Some(frame) = &status.last_frame {
            out.push_str(&format!("Last frame: {frame}\n"));
        }
        out.push_str(&format!(
            "Consecutive errors: {}/{}\n",
            status.consecutive_errors, status.failure_threshold
        ));
        if let Some(snapshot) = self.current_data() {
            out.push_str(&format!("Last snapshot: {}\n", snapshot.summary()));
        }
        out
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn region_label(&self) -> Option<String> {
        self.reader
            .as_ref()
            .filter(|r| r.is_connected())
            .map(|r| r.region_label().to_string())
    }

    /// Stops the diagnostics client, drains the frame pump and releases the
    /// region. Idempotent; the last snapshot stays readable.
    pub fn stop(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.stop();
        }
        // The pump exits once the client's sender is gone.
        if let Some(pump) = self.pump.take() {
            if pump.join().is_err() {
                tracing::error!("frame pump panicked");
            }
        }
        if let Some(mut reader) = self.reader.take() {
            reader.close();
        }
        if self.running {
            self.running = false;
            tracing::info!("update coordinator stopped");
        }
    }
}

impl Drop for UpdateCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for UpdateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCoordinator")
            .field("running", &self.running)
            .field("connected", &self.is_connected())
            .field("region", &self.region_label())
            .finish()
    }
}

fn pump_events(shared: &Mutex<State>, events: Receiver<ChannelEvent>) {
    for event in events.iter() {
        match event {
            ChannelEvent::Frame(frame) => lock(shared).apply_frame(frame),
            ChannelEvent::StateChanged(state) => {
                tracing::debug!("diagnostics channel: {state:?}");
            }
            ChannelEvent::Error(e) => {
                lock(shared).record_error(format!("diagnostics channel error: {e}"));
            }
        }
    }
    tracing::debug!("frame pump finished");
}
