//! Core types for the playback engine

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque track identifier
///
/// The backend API is not controlled by this crate; some deployments send
/// numeric ids, others strings. Both deserialize to the same canonical form
/// so identity comparisons are stable across record shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TrackId(String);

impl TrackId {
    /// String form of the identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for TrackId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for TrackId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => Ok(TrackId(s)),
            serde_json::Value::Number(n) => Ok(TrackId(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "track id must be a string or number, got {other}"
            ))),
        }
    }
}

/// Track record as supplied by the REST backend
///
/// Read-only to the engine. The audio location is not a single canonical
/// field; whatever the backend sent beyond the known fields is kept in
/// `extra` and inspected by the URI resolver's prioritized candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique identifier (stable, comparable)
    pub id: TrackId,

    /// Track title
    #[serde(default)]
    pub title: String,

    /// Artist name
    #[serde(default)]
    pub artist: String,

    /// Artwork URL or server-relative path
    #[serde(default)]
    pub artwork: Option<String>,

    /// Remaining backend fields, including the audio-location candidates
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Track {
    /// Look up a candidate field as a non-empty string
    pub(crate) fn field_str(&self, name: &str) -> Option<&str> {
        match self.extra.get(name) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

/// Coarse playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No track loaded
    Idle,

    /// Resource being created for a track
    Loading,

    /// Resource loaded and playing
    Playing,

    /// Resource loaded and paused
    Paused,
}

/// A seek request, as accepted by the public surface
///
/// Values in `[0, 1]` are fractions of the track duration; anything larger
/// is an absolute millisecond offset. A fractional seek issued before the
/// duration is known is held as a pending seek until a status update
/// reports a non-zero duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    /// Absolute offset in milliseconds
    Millis(u64),

    /// Fraction of the track duration in `[0, 1]`
    Fraction(f64),
}

impl SeekTarget {
    /// Interpret a raw slider/UI value
    pub fn from_value(value: f64) -> Self {
        if (0.0..=1.0).contains(&value) {
            SeekTarget::Fraction(value)
        } else if value.is_finite() && value > 1.0 {
            SeekTarget::Millis(value as u64)
        } else {
            SeekTarget::Millis(0)
        }
    }

    /// Convert to absolute milliseconds given a known duration
    pub(crate) fn resolve(self, duration_ms: u64) -> u64 {
        match self {
            SeekTarget::Millis(ms) => ms,
            SeekTarget::Fraction(f) => (f * duration_ms as f64).round() as u64,
        }
    }
}

/// Observable playback state
///
/// Recomputed on every underlying status event and published through a
/// `watch` channel. Position and duration are absolute values; both the
/// poll timer and the hardware callback overwrite them (last writer wins).
#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    /// Track currently loaded or loading
    pub current_track: Option<Track>,

    /// Coarse state machine position
    pub state: PlaybackState,

    /// Whether audio is audibly progressing
    pub is_playing: bool,

    /// Playback position in milliseconds
    pub position_ms: u64,

    /// Track duration in milliseconds (0 until the resource reports it)
    pub duration_ms: u64,

    /// Active queue in play order
    pub queue: Vec<Track>,

    /// Index of the current track in `queue` (None when the queue is empty)
    pub queue_index: Option<usize>,

    /// Whether the queue is shuffled
    pub is_shuffled: bool,

    /// Whether single-track repeat is active
    pub is_repeat: bool,

    /// Volume in `[0, 1]`
    pub volume: f32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current_track: None,
            state: PlaybackState::Idle,
            is_playing: false,
            position_ms: 0,
            duration_ms: 0,
            queue: Vec::new(),
            queue_index: None,
            is_shuffled: false,
            is_repeat: false,
            volume: 1.0,
        }
    }
}

/// Configuration for the playback engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// REST backend origin, used to absolutize relative media paths
    pub base_url: String,

    /// Key-value store key for the persisted volume preference
    pub volume_key: String,

    /// Position tracker poll interval (default: 500 ms)
    pub poll_interval: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            volume_key: "player:volume".to_string(),
            poll_interval: Duration::from_millis(500),
        }
    }
}
