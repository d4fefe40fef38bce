//! Playback engine
//!
//! The engine is a single actor task that owns the queue, the pending
//! seek, and the one live audio resource. Public commands enter a FIFO
//! and are processed one at a time to completion, so a second `play` can
//! never race the stop/create sequence of the first. Status updates from
//! the position tracker and from the hardware callback stream feed a
//! second channel consumed by the same task; each update overwrites the
//! published snapshot (last writer wins on absolute values).
//!
//! No public operation returns an error: hardware, persistence, and
//! ledger failures are logged and degrade to no-ops, leaving the snapshot
//! at the last successfully-applied fact.

use crate::ledger::PlayCounts;
use crate::output::{AudioBackend, AudioHandle, LoadedResource, ResourceStatus};
use crate::queue::QueueManager;
use crate::resolve::UriResolver;
use crate::store::KeyValueStore;
use crate::tracker::PositionTracker;
use crate::types::{PlaybackState, PlayerConfig, PlayerState, SeekTarget, Track};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Options for a `play` command
#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    /// Replacement queue to adopt before playing
    pub queue: Option<Vec<Track>>,

    /// Index of the requested track within `queue`
    pub index: Option<usize>,

    /// Engine-driven advance, as opposed to a user picking a track
    pub(crate) internal: bool,
}

impl PlayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the queue along with the play request
    pub fn with_queue(queue: Vec<Track>, index: usize) -> Self {
        Self {
            queue: Some(queue),
            index: Some(index),
            internal: false,
        }
    }

    pub(crate) fn internal() -> Self {
        Self {
            queue: None,
            index: None,
            internal: true,
        }
    }
}

enum Command {
    Play { track: Track, opts: PlayOptions },
    Pause,
    Seek { target: SeekTarget },
    Next,
    Prev,
    ToggleShuffle,
    ToggleRepeat,
    SetVolume { volume: f32 },
}

struct Envelope {
    command: Command,
    done: oneshot::Sender<()>,
}

/// Handle to a running playback engine
///
/// Cheap to clone. All operations are serialized through the engine's
/// command FIFO; awaiting an operation means it has been fully applied.
#[derive(Clone)]
pub struct Player {
    commands: mpsc::Sender<Envelope>,
    state: watch::Receiver<PlayerState>,
}

impl Player {
    /// Spawn a playback engine with the given collaborators
    ///
    /// Fails only if the configured base URL is not a valid http(s)
    /// origin. The persisted volume preference is read (best-effort)
    /// before the first command is processed.
    pub fn new(
        config: PlayerConfig,
        backend: Arc<dyn AudioBackend>,
        store: Arc<dyn KeyValueStore>,
        counts: Arc<dyn PlayCounts>,
    ) -> crate::Result<Self> {
        let resolver = UriResolver::new(&config.base_url)?;

        let (command_tx, command_rx) = mpsc::channel(32);
        let (status_tx, status_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(PlayerState::default());

        let engine = Engine {
            tracker: PositionTracker::new(config.poll_interval, status_tx.clone()),
            config,
            resolver,
            backend,
            store,
            counts,
            queue: QueueManager::new(),
            state: state_tx,
            status_tx,
            handle: None,
            current: None,
            pending_seek: None,
            volume: 1.0,
            event_pump: None,
        };
        tokio::spawn(engine.run(command_rx, status_rx));

        Ok(Self {
            commands: command_tx,
            state: state_rx,
        })
    }

    /// Subscribe to snapshot updates
    pub fn state(&self) -> watch::Receiver<PlayerState> {
        self.state.clone()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> PlayerState {
        self.state.borrow().clone()
    }

    /// Play a track, optionally re-seeding the queue
    pub async fn play(&self, track: Track, opts: PlayOptions) {
        self.send(Command::Play { track, opts }).await;
    }

    /// Pause playback; no-op if nothing is playing
    pub async fn pause(&self) {
        self.send(Command::Pause).await;
    }

    /// Seek: values in `[0, 1]` are fractions, larger values milliseconds
    pub async fn seek_to(&self, value: f64) {
        self.send(Command::Seek {
            target: SeekTarget::from_value(value),
        })
        .await;
    }

    /// Advance to the next queue slot (clears repeat)
    pub async fn play_next(&self) {
        self.send(Command::Next).await;
    }

    /// Step back to the previous queue slot (clears repeat)
    pub async fn play_prev(&self) {
        self.send(Command::Prev).await;
    }

    /// Toggle queue shuffle
    pub async fn toggle_shuffle(&self) {
        self.send(Command::ToggleShuffle).await;
    }

    /// Toggle single-track repeat
    pub async fn toggle_repeat(&self) {
        self.send(Command::ToggleRepeat).await;
    }

    /// Set volume, clamped to `[0, 1]` and persisted best-effort
    pub async fn set_volume(&self, volume: f32) {
        self.send(Command::SetVolume { volume }).await;
    }

    async fn send(&self, command: Command) {
        let (done, ack) = oneshot::channel();
        if self
            .commands
            .send(Envelope { command, done })
            .await
            .is_ok()
        {
            // Engine dropped mid-command only at teardown
            let _ = ack.await;
        }
    }
}

struct Engine {
    config: PlayerConfig,
    resolver: UriResolver,
    backend: Arc<dyn AudioBackend>,
    store: Arc<dyn KeyValueStore>,
    counts: Arc<dyn PlayCounts>,

    queue: QueueManager,
    tracker: PositionTracker,
    state: watch::Sender<PlayerState>,

    /// Cloned into the tracker and per-resource event pumps; both sources
    /// funnel into the status channel the run loop consumes.
    status_tx: mpsc::Sender<ResourceStatus>,

    /// The single live audio resource
    handle: Option<Arc<dyn AudioHandle>>,
    current: Option<Track>,
    pending_seek: Option<SeekTarget>,
    volume: f32,

    /// Forwards the live resource's callback events into `status_tx`
    event_pump: Option<JoinHandle<()>>,
}

impl Engine {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Envelope>,
        mut statuses: mpsc::Receiver<ResourceStatus>,
    ) {
        self.load_persisted_volume().await;

        loop {
            tokio::select! {
                envelope = commands.recv() => match envelope {
                    Some(Envelope { command, done }) => {
                        self.handle_command(command).await;
                        let _ = done.send(());
                    }
                    None => break,
                },
                Some(status) = statuses.recv() => {
                    self.apply_status(status).await;
                }
            }
        }

        // All Player handles dropped: release the resource
        self.tracker.stop();
        self.stop_event_pump();
        if let Some(handle) = self.handle.take() {
            let _ = handle.stop().await;
            let _ = handle.unload().await;
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Play { track, opts } => self.play(track, opts).await,
            Command::Pause => self.pause().await,
            Command::Seek { target } => self.seek(target).await,
            Command::Next => self.navigate(Direction::Next).await,
            Command::Prev => self.navigate(Direction::Prev).await,
            Command::ToggleShuffle => self.toggle_shuffle(),
            Command::ToggleRepeat => self.toggle_repeat().await,
            Command::SetVolume { volume } => self.set_volume(volume).await,
        }
    }

    async fn load_persisted_volume(&mut self) {
        match self.store.get(&self.config.volume_key).await {
            Ok(Some(raw)) => match raw.parse::<f32>() {
                Ok(v) if v.is_finite() => {
                    self.volume = v.clamp(0.0, 1.0);
                    let volume = self.volume;
                    self.state.send_modify(|st| st.volume = volume);
                }
                _ => debug!(raw, "ignoring malformed stored volume"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to read stored volume"),
        }
    }

    async fn play(&mut self, track: Track, mut opts: PlayOptions) {
        let explicit_queue = opts.queue.is_some();
        if let Some(tracks) = opts.queue.take() {
            self.queue.set_queue(tracks, opts.index);
        }

        // A user explicitly picking a track while shuffled adopts the
        // caller's queue/index as the new canonical order.
        if self.queue.is_shuffled() && !opts.internal {
            self.queue.clear_shuffle();
        }

        // Picking a track already in the queue re-points the index at it
        if !explicit_queue && !opts.internal {
            self.queue.select(&track.id);
        }
        self.publish_queue();

        if self.try_resume(&track).await {
            return;
        }

        // Resolve before touching the live resource: an unplayable track
        // must not interrupt whatever is currently playing.
        let Some(uri) = self.resolver.resolve(&track) else {
            warn!(track = %track.id, "no playable audio location on track");
            return;
        };

        self.stop_and_unload().await;

        self.state
            .send_modify(|st| st.state = PlaybackState::Loading);

        let LoadedResource {
            handle,
            status,
            events,
        } = match self.backend.load(&uri, true).await {
            Ok(resource) => resource,
            Err(e) => {
                warn!(track = %track.id, error = %e, "failed to load audio resource");
                self.state.send_modify(|st| {
                    st.state = PlaybackState::Idle;
                    st.is_playing = false;
                });
                return;
            }
        };
        self.handle = Some(Arc::clone(&handle));

        if let Err(e) = handle.set_volume(self.volume).await {
            warn!(error = %e, "failed to apply volume to new resource");
        }
        if let Err(e) = handle.set_looping(self.queue.is_repeat()).await {
            warn!(error = %e, "failed to apply looping to new resource");
        }

        // A seek requested before this load may be consumable already;
        // fractional seeks keep waiting if the duration is still unknown.
        let mut position_ms = 0;
        if let Some(target) = self.pending_seek {
            let consumable = !matches!(target, SeekTarget::Fraction(_)) || status.duration_ms > 0;
            if consumable {
                self.pending_seek = None;
                let ms = target.resolve(status.duration_ms);
                match handle.seek_to(ms).await {
                    Ok(()) => position_ms = ms,
                    Err(e) => warn!(error = %e, "failed to apply pending seek at load"),
                }
            }
        }

        self.current = Some(track.clone());
        self.state.send_modify(|st| {
            st.current_track = Some(track.clone());
            st.state = PlaybackState::Playing;
            st.is_playing = true;
            st.position_ms = position_ms;
            st.duration_ms = status.duration_ms;
        });

        self.notify_play_started(&track).await;
        self.tracker.start(Arc::clone(&handle));
        self.spawn_event_pump(events);
    }

    /// Resume path: same track, resource still loaded
    async fn try_resume(&mut self, track: &Track) -> bool {
        let same = self
            .current
            .as_ref()
            .is_some_and(|current| current.id == track.id);
        let Some(handle) = self.handle.clone().filter(|_| same) else {
            return false;
        };

        let loaded = matches!(handle.status().await, Ok(status) if status.is_loaded);
        if !loaded {
            return false;
        }

        if let Err(e) = handle.play().await {
            warn!(track = %track.id, error = %e, "failed to resume playback");
            return true; // same-track command consumed; no reload on failure
        }
        // The resource's loop flag may have drifted from the repeat toggle
        if let Err(e) = handle.set_looping(self.queue.is_repeat()).await {
            warn!(error = %e, "failed to re-apply looping on resume");
        }

        self.state.send_modify(|st| {
            st.state = PlaybackState::Playing;
            st.is_playing = true;
        });
        self.tracker.start(handle);
        self.notify_play_started(track).await;
        true
    }

    async fn pause(&mut self) {
        let Some(handle) = &self.handle else { return };

        match handle.status().await {
            Ok(status) if status.is_loaded && status.is_playing => {
                if let Err(e) = handle.pause().await {
                    warn!(error = %e, "pause failed");
                    return;
                }
                self.state.send_modify(|st| {
                    st.state = PlaybackState::Paused;
                    st.is_playing = false;
                });
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "status fetch failed during pause"),
        }
    }

    async fn seek(&mut self, target: SeekTarget) {
        let Some(handle) = self.handle.clone() else {
            debug!("seek ignored: no resource");
            return;
        };

        let status = match handle.status().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "status fetch failed during seek; deferring");
                self.pending_seek = Some(target);
                return;
            }
        };

        let known_duration = if status.duration_ms > 0 {
            status.duration_ms
        } else {
            self.state.borrow().duration_ms
        };

        let ready = status.is_loaded
            && (!matches!(target, SeekTarget::Fraction(_)) || known_duration > 0);
        if !ready {
            self.pending_seek = Some(target);
            return;
        }

        let ms = target.resolve(known_duration);
        match handle.seek_to(ms).await {
            Ok(()) => self.state.send_modify(|st| st.position_ms = ms),
            Err(e) => warn!(position_ms = ms, error = %e, "seek failed"),
        }
    }

    async fn navigate(&mut self, direction: Direction) {
        // Explicit navigation overrides looping
        if self.queue.is_repeat() {
            self.queue.set_repeat(false);
            if let Some(handle) = &self.handle {
                if let Err(e) = handle.set_looping(false).await {
                    warn!(error = %e, "failed to clear looping on navigation");
                }
            }
        }

        let index = match direction {
            Direction::Next => self.queue.next(),
            Direction::Prev => self.queue.prev(),
        };
        let Some(index) = index else {
            self.publish_queue();
            return;
        };
        let Some(track) = self.queue.track_at(index).cloned() else {
            return;
        };

        self.publish_queue();
        self.play(track, PlayOptions::internal()).await;
    }

    fn toggle_shuffle(&mut self) {
        let current = self.current.as_ref().map(|t| t.id.clone());
        self.queue.toggle_shuffle(current.as_ref());
        self.publish_queue();
    }

    async fn toggle_repeat(&mut self) {
        let repeat = self.queue.toggle_repeat();
        if let Some(handle) = &self.handle {
            if let Err(e) = handle.set_looping(repeat).await {
                warn!(repeat, error = %e, "failed to apply looping");
            }
        }
        self.publish_queue();
    }

    async fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.volume = volume;
        self.state.send_modify(|st| st.volume = volume);

        if let Some(handle) = &self.handle {
            if let Err(e) = handle.set_volume(volume).await {
                warn!(volume, error = %e, "failed to apply volume");
            }
        }

        // In-memory volume stays authoritative if persistence fails
        if let Err(e) = self
            .store
            .set(&self.config.volume_key, &volume.to_string())
            .await
        {
            warn!(error = %e, "failed to persist volume");
        }
    }

    /// Consume one status update from either producer
    async fn apply_status(&mut self, status: ResourceStatus) {
        let mut position_ms = status.position_ms;

        // Pending seeks resolve exactly once, on the first update that
        // carries a usable duration.
        if let Some(target) = self.pending_seek {
            if status.duration_ms > 0 {
                self.pending_seek = None;
                let ms = target.resolve(status.duration_ms);
                if let Some(handle) = &self.handle {
                    match handle.seek_to(ms).await {
                        Ok(()) => position_ms = ms,
                        Err(e) => warn!(position_ms = ms, error = %e, "pending seek failed"),
                    }
                }
            }
        }

        self.state.send_modify(|st| {
            st.position_ms = position_ms;
            st.duration_ms = status.duration_ms;
            st.is_playing = status.is_playing;
            if st.current_track.is_some() && st.state != PlaybackState::Idle {
                st.state = if status.is_playing {
                    PlaybackState::Playing
                } else {
                    PlaybackState::Paused
                };
            }
        });

        if status.did_just_finish && !self.queue.is_repeat() {
            self.advance_after_completion().await;
        }
    }

    /// Engine-driven advance on natural end-of-track
    async fn advance_after_completion(&mut self) {
        if self.queue.is_empty() {
            debug!("queue exhausted; going idle");
            self.tracker.stop();
            self.stop_event_pump();
            if let Some(handle) = self.handle.take() {
                let _ = handle.stop().await;
                if let Err(e) = handle.unload().await {
                    warn!(error = %e, "failed to release finished resource");
                }
            }
            self.current = None;
            self.state.send_modify(|st| {
                st.current_track = None;
                st.state = PlaybackState::Idle;
                st.is_playing = false;
            });
            return;
        }

        let next = self
            .queue
            .next()
            .and_then(|index| self.queue.track_at(index).cloned());
        if let Some(track) = next {
            self.publish_queue();
            self.play(track, PlayOptions::internal()).await;
        }
    }

    /// Fully release the live resource before a replacement is created
    async fn stop_and_unload(&mut self) {
        self.tracker.stop();
        self.stop_event_pump();

        if let Some(handle) = self.handle.take() {
            // Stop failures are expected when the resource already ended
            let _ = handle.stop().await;
            if let Err(e) = handle.unload().await {
                warn!(error = %e, "failed to unload superseded resource");
            }
        }
    }

    fn stop_event_pump(&mut self) {
        if let Some(pump) = self.event_pump.take() {
            pump.abort();
        }
    }

    fn spawn_event_pump(&mut self, mut events: mpsc::Receiver<ResourceStatus>) {
        self.stop_event_pump();
        let status_tx = self.status_tx.clone();
        self.event_pump = Some(tokio::spawn(async move {
            while let Some(status) = events.recv().await {
                if status_tx.send(status).await.is_err() {
                    break;
                }
            }
        }));
    }

    async fn notify_play_started(&self, track: &Track) {
        if let Err(e) = self.counts.notify_play_started(track).await {
            warn!(track = %track.id, error = %e, "play-count notification failed");
        }
    }

    fn publish_queue(&mut self) {
        let tracks = self.queue.tracks().to_vec();
        let index = self.queue.current_index();
        let shuffled = self.queue.is_shuffled();
        let repeat = self.queue.is_repeat();
        self.state.send_modify(|st| {
            st.queue = tracks;
            st.queue_index = index;
            st.is_shuffled = shuffled;
            st.is_repeat = repeat;
        });
    }
}

enum Direction {
    Next,
    Prev,
}
