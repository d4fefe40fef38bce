//! Play-count ledger
//!
//! The engine notifies the ledger on every successful play-start; the
//! notification is best-effort and never blocks or fails playback. The
//! bundled [`StoredPlayCounts`] keeps a JSON map in the injected key-value
//! store and powers "most played" views.

use crate::error::Result;
use crate::resolve::UriResolver;
use crate::store::KeyValueStore;
use crate::types::{Track, TrackId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Storage key for the serialized ledger
const PLAY_COUNTS_KEY: &str = "play_counts_v1";

/// Play-start notification sink
#[async_trait]
pub trait PlayCounts: Send + Sync {
    /// Record that a track just started playing
    ///
    /// Resuming an already-loaded track counts as a play-start too.
    async fn notify_play_started(&self, track: &Track) -> Result<()>;
}

/// One ledger entry per track id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayCountEntry {
    /// Number of play-starts observed
    pub count: u64,

    /// Title at last play (kept fresh on every notification)
    pub title: String,

    /// Artist at last play
    pub artist: String,

    /// Absolutized artwork URL, if the track had one
    pub artwork: Option<String>,

    /// Timestamp of the most recent play-start
    pub last_played_at: Option<DateTime<Utc>>,
}

/// Ledger persisted through a [`KeyValueStore`]
pub struct StoredPlayCounts {
    store: Arc<dyn KeyValueStore>,
    resolver: UriResolver,
}

impl StoredPlayCounts {
    pub fn new(store: Arc<dyn KeyValueStore>, resolver: UriResolver) -> Self {
        Self { store, resolver }
    }

    async fn read_map(&self) -> Result<HashMap<String, PlayCountEntry>> {
        match self.store.get(PLAY_COUNTS_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(HashMap::new()),
        }
    }

    async fn write_map(&self, map: &HashMap<String, PlayCountEntry>) -> Result<()> {
        let raw = serde_json::to_string(map)?;
        self.store.set(PLAY_COUNTS_KEY, &raw).await
    }

    /// All entries, most played first
    pub async fn all(&self) -> Result<Vec<(TrackId, PlayCountEntry)>> {
        let map = self.read_map().await?;
        let mut entries: Vec<(TrackId, PlayCountEntry)> = map
            .into_iter()
            .map(|(id, entry)| (TrackId::from(id), entry))
            .collect();
        entries.sort_by(|a, b| b.1.count.cmp(&a.1.count));
        Ok(entries)
    }

    /// The single most played track, if any plays were recorded
    pub async fn most_played(&self) -> Result<Option<(TrackId, PlayCountEntry)>> {
        Ok(self.all().await?.into_iter().next())
    }

    /// Drop all recorded plays
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(PLAY_COUNTS_KEY).await
    }
}

#[async_trait]
impl PlayCounts for StoredPlayCounts {
    async fn notify_play_started(&self, track: &Track) -> Result<()> {
        let mut map = self.read_map().await?;
        let artwork = self.resolver.resolve_artwork(track);

        let entry = map
            .entry(track.id.to_string())
            .or_insert_with(|| PlayCountEntry {
                count: 0,
                title: track.title.clone(),
                artist: track.artist.clone(),
                artwork: artwork.clone(),
                last_played_at: None,
            });

        entry.count += 1;
        if !track.title.is_empty() {
            entry.title = track.title.clone();
        }
        if !track.artist.is_empty() {
            entry.artist = track.artist.clone();
        }
        if artwork.is_some() {
            entry.artwork = artwork;
        }
        entry.last_played_at = Some(Utc::now());

        self.write_map(&map).await
    }
}

/// Ledger that drops every notification
///
/// For hosts that do not track play counts.
#[derive(Debug, Default)]
pub struct NullPlayCounts;

#[async_trait]
impl PlayCounts for NullPlayCounts {
    async fn notify_play_started(&self, _track: &Track) -> Result<()> {
        Ok(())
    }
}
