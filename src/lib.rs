//! Muse Player - Playback Engine
//!
//! Platform-agnostic playback engine for the Muse music client.
//!
//! This crate provides:
//! - Queue management with circular navigation
//! - Shuffle with exact order restore (Fisher–Yates, no-op rejection)
//! - Single-track repeat
//! - Seek by absolute milliseconds or duration fraction, with pending
//!   seeks held until the duration is known
//! - URI resolution over heterogeneous backend track records
//! - Volume control with clamped, persisted preference
//! - Play-count ledger with "most played" queries
//! - 500 ms position tracking merged with hardware status callbacks
//!
//! # Architecture
//!
//! The engine is a single actor task owning all mutable state. Commands
//! from any number of [`Player`] handles enter a FIFO and are applied one
//! at a time; observers receive immutable [`PlayerState`] snapshots
//! through a `watch` channel.
//!
//! Platform-specific code is injected via traits:
//! - [`AudioBackend`] / [`AudioHandle`] — the media layer (web audio,
//!   native decoder, test fake)
//! - [`KeyValueStore`] — durable preferences (browser storage, app
//!   settings, [`MemoryStore`] for tests)
//! - [`PlayCounts`] — play-start notifications ([`StoredPlayCounts`] or
//!   [`NullPlayCounts`])
//!
//! # Example: Track Records
//!
//! Track records come straight from the REST backend; the audio location
//! field varies by deployment and is resolved through a prioritized
//! candidate list:
//!
//! ```rust
//! use muse_playback::{Track, UriResolver};
//!
//! let track: Track = serde_json::from_str(
//!     r#"{ "id": 7, "title": "My Song", "artist": "Band", "audio_file": "/media/7.mp3" }"#,
//! )
//! .unwrap();
//!
//! let resolver = UriResolver::new("http://127.0.0.1:8000").unwrap();
//! assert_eq!(
//!     resolver.resolve(&track),
//!     Some("http://127.0.0.1:8000/media/7.mp3".to_string())
//! );
//! ```
//!
//! # Example: Driving the Engine
//!
//! ```rust,no_run
//! use muse_playback::{
//!     AudioBackend, MemoryStore, NullPlayCounts, PlayOptions, Player, PlayerConfig, Track,
//! };
//! use std::sync::Arc;
//!
//! async fn start(backend: Arc<dyn AudioBackend>, tracks: Vec<Track>) -> muse_playback::Result<()> {
//!     let player = Player::new(
//!         PlayerConfig::default(),
//!         backend,
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(NullPlayCounts),
//!     )?;
//!
//!     let first = tracks[0].clone();
//!     player.play(first, PlayOptions::with_queue(tracks, 0)).await;
//!     player.seek_to(0.5).await; // halfway through the track
//!     player.set_volume(0.8).await;
//!     player.play_next().await;
//!
//!     let state = player.snapshot();
//!     println!("now playing: {:?}", state.current_track);
//!     Ok(())
//! }
//! ```

mod cache;
mod engine;
mod error;
mod ledger;
mod output;
mod queue;
mod resolve;
mod shuffle;
mod store;
mod tracker;
pub mod types;

#[cfg(test)]
mod testing;

// Public exports
pub use cache::AssetCache;
pub use engine::{PlayOptions, Player};
pub use error::{PlayerError, Result};
pub use ledger::{NullPlayCounts, PlayCountEntry, PlayCounts, StoredPlayCounts};
pub use output::{AudioBackend, AudioHandle, LoadedResource, ResourceStatus};
pub use resolve::{UriResolver, AUDIO_FIELD_CANDIDATES};
pub use store::{KeyValueStore, MemoryStore};
pub use types::{PlaybackState, PlayerConfig, PlayerState, SeekTarget, Track, TrackId};
