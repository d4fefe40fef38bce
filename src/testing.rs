//! Test doubles for the audio capability and collaborators
//!
//! A scriptable backend/handle pair that records every call and can emit
//! hardware-style status events, shared by the tracker and engine tests.

use crate::error::{PlayerError, Result};
use crate::ledger::PlayCounts;
use crate::output::{AudioBackend, AudioHandle, LoadedResource, ResourceStatus};
use crate::types::Track;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Calls observed on a fake handle, in order
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HandleCall {
    Play,
    Pause,
    Stop,
    Unload,
    Seek(u64),
    Volume(f32),
    Looping(bool),
}

/// Fake audio resource
///
/// Status is fully scriptable; `emit` pushes the current status through
/// the hardware-callback channel the engine pumps.
pub(crate) struct FakeHandle {
    id: usize,
    status: Mutex<ResourceStatus>,
    calls: Mutex<Vec<HandleCall>>,
    log: Arc<Mutex<Vec<String>>>,
    events_tx: mpsc::Sender<ResourceStatus>,
    failing: AtomicBool,
}

impl FakeHandle {
    /// Standalone loaded handle (no backend, events unobserved)
    pub fn loaded(duration_ms: u64) -> Arc<Self> {
        let (events_tx, _) = mpsc::channel(16);
        Arc::new(Self {
            id: 0,
            status: Mutex::new(ResourceStatus {
                is_loaded: true,
                duration_ms,
                ..Default::default()
            }),
            calls: Mutex::new(Vec::new()),
            log: Arc::new(Mutex::new(Vec::new())),
            events_tx,
            failing: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> Vec<HandleCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn seek_calls(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HandleCall::Seek(ms) => Some(ms),
                _ => None,
            })
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_position(&self, position_ms: u64) {
        self.status.lock().unwrap().position_ms = position_ms;
    }

    pub fn set_loaded(&self, duration_ms: u64) {
        let mut status = self.status.lock().unwrap();
        status.is_loaded = true;
        status.duration_ms = duration_ms;
    }

    pub fn set_unloaded(&self) {
        self.status.lock().unwrap().is_loaded = false;
    }

    fn snapshot(&self) -> ResourceStatus {
        *self.status.lock().unwrap()
    }

    /// Emit the current status as a hardware callback event
    pub async fn emit(&self) {
        let status = ResourceStatus {
            did_just_finish: false,
            ..self.snapshot()
        };
        let _ = self.events_tx.send(status).await;
    }

    /// Emit a natural end-of-track event
    pub async fn emit_finished(&self) {
        let snapshot = self.snapshot();
        let status = ResourceStatus {
            is_playing: false,
            position_ms: snapshot.duration_ms,
            did_just_finish: true,
            ..snapshot
        };
        let _ = self.events_tx.send(status).await;
    }

    /// Record a call; only lifecycle calls (stop, unload) enter the shared
    /// ordered log, matching what `lifecycle_log` promises.
    fn record(&self, call: HandleCall) {
        let lifecycle = match call {
            HandleCall::Stop => Some("stop"),
            HandleCall::Unload => Some("unload"),
            _ => None,
        };
        if let Some(label) = lifecycle {
            self.log
                .lock()
                .unwrap()
                .push(format!("{label} #{}", self.id));
        }
        self.calls.lock().unwrap().push(call);
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PlayerError::Backend("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AudioHandle for FakeHandle {
    async fn play(&self) -> Result<()> {
        self.check_failing()?;
        self.record(HandleCall::Play);
        self.status.lock().unwrap().is_playing = true;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.check_failing()?;
        self.record(HandleCall::Pause);
        self.status.lock().unwrap().is_playing = false;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.check_failing()?;
        self.record(HandleCall::Stop);
        self.status.lock().unwrap().is_playing = false;
        Ok(())
    }

    async fn unload(&self) -> Result<()> {
        self.check_failing()?;
        self.record(HandleCall::Unload);
        let mut status = self.status.lock().unwrap();
        status.is_loaded = false;
        status.is_playing = false;
        Ok(())
    }

    async fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.check_failing()?;
        self.record(HandleCall::Seek(position_ms));
        self.status.lock().unwrap().position_ms = position_ms;
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> Result<()> {
        self.check_failing()?;
        self.record(HandleCall::Volume(volume));
        Ok(())
    }

    async fn set_looping(&self, looping: bool) -> Result<()> {
        self.check_failing()?;
        self.record(HandleCall::Looping(looping));
        Ok(())
    }

    async fn status(&self) -> Result<ResourceStatus> {
        self.check_failing()?;
        Ok(ResourceStatus {
            did_just_finish: false,
            ..self.snapshot()
        })
    }
}

/// Fake audio backend
///
/// Hands out [`FakeHandle`]s and keeps a shared ordered log of lifecycle
/// calls (`load`, `stop`, `unload`) across all handles, so tests can assert
/// stop+release ordering around replacement.
pub(crate) struct FakeBackend {
    log: Arc<Mutex<Vec<String>>>,
    handles: Mutex<Vec<Arc<FakeHandle>>>,
    uris: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    load_duration_ms: AtomicU64,
    fail_loads: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Arc::new(Mutex::new(Vec::new())),
            handles: Mutex::new(Vec::new()),
            uris: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            load_duration_ms: AtomicU64::new(180_000),
            fail_loads: AtomicBool::new(false),
        })
    }

    /// Duration reported by the load status (0 = unknown at load time)
    pub fn set_load_duration(&self, duration_ms: u64) {
        self.load_duration_ms.store(duration_ms, Ordering::SeqCst);
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn load_count(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    pub fn loaded_uris(&self) -> Vec<String> {
        self.uris.lock().unwrap().clone()
    }

    pub fn handle(&self, index: usize) -> Arc<FakeHandle> {
        Arc::clone(&self.handles.lock().unwrap()[index])
    }

    pub fn lifecycle_log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioBackend for FakeBackend {
    async fn load(&self, uri: &str, autoplay: bool) -> Result<LoadedResource> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(PlayerError::Backend("load rejected".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(format!("load #{id}"));
        self.uris.lock().unwrap().push(uri.to_string());

        let (events_tx, events) = mpsc::channel(16);
        let status = ResourceStatus {
            is_loaded: true,
            is_playing: autoplay,
            position_ms: 0,
            duration_ms: self.load_duration_ms.load(Ordering::SeqCst),
            did_just_finish: false,
        };

        let handle = Arc::new(FakeHandle {
            id,
            status: Mutex::new(status),
            calls: Mutex::new(Vec::new()),
            log: Arc::clone(&self.log),
            events_tx,
            failing: AtomicBool::new(false),
        });
        self.handles.lock().unwrap().push(Arc::clone(&handle));

        Ok(LoadedResource {
            handle,
            status,
            events,
        })
    }
}

/// Ledger fake that counts notifications
#[derive(Default)]
pub(crate) struct CountingLedger {
    notified: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl CountingLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlayCounts for CountingLedger {
    async fn notify_play_started(&self, track: &Track) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlayerError::Storage("ledger unavailable".to_string()));
        }
        self.notified.lock().unwrap().push(track.id.to_string());
        Ok(())
    }
}
