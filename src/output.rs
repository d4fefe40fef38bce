//! Audio output capability
//!
//! Abstracts the platform's media layer behind traits so the engine works
//! against web audio elements, native decoders, or test fakes. The engine
//! owns at most one live [`AudioHandle`] at a time; a superseded handle is
//! stopped and unloaded before a replacement is created.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Time-based status reported by a loaded resource
///
/// Both the position tracker's polls and the hardware's own status
/// callbacks deliver this shape; every update overwrites the published
/// snapshot fields because both sources report absolute ground truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    /// Whether the resource finished loading
    pub is_loaded: bool,

    /// Whether audio is currently progressing
    pub is_playing: bool,

    /// Playback position in milliseconds
    pub position_ms: u64,

    /// Track duration in milliseconds (0 while unknown)
    pub duration_ms: u64,

    /// Set on the status event that marks natural end-of-track
    pub did_just_finish: bool,
}

/// A freshly created audio resource
///
/// `status` is the load-time status (duration may already be known);
/// `events` is the hardware's asynchronous status callback stream, pumped
/// into the engine for the resource's lifetime.
pub struct LoadedResource {
    /// Control handle for the resource
    pub handle: Arc<dyn AudioHandle>,

    /// Status observed at load completion
    pub status: ResourceStatus,

    /// Ongoing status updates from the platform layer
    pub events: mpsc::Receiver<ResourceStatus>,
}

/// Factory for audio resources
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Create and load a resource for the given URI
    ///
    /// With `autoplay` set, playback starts as soon as loading permits.
    async fn load(&self, uri: &str, autoplay: bool) -> Result<LoadedResource>;
}

/// Control surface of a single loaded audio resource
#[async_trait]
pub trait AudioHandle: Send + Sync {
    /// Start or resume playback
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the resource loaded
    async fn pause(&self) -> Result<()>;

    /// Stop playback
    async fn stop(&self) -> Result<()>;

    /// Release the underlying resource
    async fn unload(&self) -> Result<()>;

    /// Seek to an absolute position
    async fn seek_to(&self, position_ms: u64) -> Result<()>;

    /// Set output volume in `[0, 1]`
    async fn set_volume(&self, volume: f32) -> Result<()>;

    /// Enable or disable single-track looping
    async fn set_looping(&self, looping: bool) -> Result<()>;

    /// Fetch the current time-based status
    async fn status(&self) -> Result<ResourceStatus>;
}
