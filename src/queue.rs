//! Queue manager
//!
//! Owns the ordered track list, the current index, and the shuffle/repeat
//! toggles. Navigation is circular. Shuffle keeps a snapshot of the
//! pre-shuffle order so toggling it off restores the queue bit-for-bit.

use crate::shuffle::shuffled_copy;
use crate::types::{Track, TrackId};

/// Ordered play queue with shuffle and repeat state
///
/// Invariants:
/// - `original_order` is non-empty iff `shuffled` is true.
/// - The current index always addresses a valid slot while the queue is
///   non-empty.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueueManager {
    tracks: Vec<Track>,
    index: usize,

    /// Pre-shuffle order, restored verbatim when shuffle turns off
    original_order: Vec<Track>,
    shuffled: bool,

    /// Single-track loop; cleared by explicit next/prev navigation
    repeat: bool,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue and optionally the current index
    ///
    /// When shuffle is inactive the new list becomes the canonical order
    /// snapshotted for future shuffles. When shuffle is active the snapshot
    /// is left alone so an engine-driven advance cannot clobber it.
    pub fn set_queue(&mut self, tracks: Vec<Track>, index: Option<usize>) {
        self.tracks = tracks;
        if let Some(i) = index {
            self.index = i.min(self.tracks.len().saturating_sub(1));
        } else if self.tracks.is_empty() {
            self.index = 0;
        } else {
            self.index = self.index.min(self.tracks.len() - 1);
        }

        if !self.shuffled {
            self.original_order = self.tracks.clone();
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        if self.tracks.is_empty() {
            None
        } else {
            Some(self.index.min(self.tracks.len() - 1))
        }
    }

    pub fn track_at(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Point the current index at the given track, if it is queued
    pub fn select(&mut self, id: &TrackId) -> Option<usize> {
        let pos = self.tracks.iter().position(|t| &t.id == id)?;
        self.index = pos;
        Some(pos)
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    pub fn is_repeat(&self) -> bool {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
    }

    /// Flip the repeat flag, returning the new value
    pub fn toggle_repeat(&mut self) -> bool {
        self.repeat = !self.repeat;
        self.repeat
    }

    /// Advance to the next slot, wrapping circularly
    ///
    /// Explicit navigation overrides looping: an active repeat flag is
    /// cleared before the index moves.
    pub fn next(&mut self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        self.repeat = false;
        self.index = (self.index + 1) % self.tracks.len();
        Some(self.index)
    }

    /// Step back to the previous slot, wrapping circularly
    pub fn prev(&mut self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        self.repeat = false;
        self.index = if self.index > 0 {
            self.index - 1
        } else {
            self.tracks.len() - 1
        };
        Some(self.index)
    }

    /// Turn shuffle off without restoring the snapshot
    ///
    /// Used when the user explicitly picks a track while shuffled: the
    /// caller's queue/index is the new canonical order, so no reshuffle or
    /// restore happens.
    pub fn clear_shuffle(&mut self) {
        self.shuffled = false;
        self.original_order.clear();
    }

    /// Toggle shuffle, returning the new state
    ///
    /// Turning on snapshots the current order, shuffles, and relocates the
    /// current track to the pre-shuffle slot so "next" keeps drawing from
    /// not-yet-played tracks. Turning off restores the snapshot and finds
    /// the current track in it by id; if the track is gone, the slot before
    /// where the next shuffled track maps back is used, else 0.
    pub fn toggle_shuffle(&mut self, current: Option<&TrackId>) -> bool {
        if self.tracks.is_empty() {
            return self.shuffled;
        }

        if self.shuffled {
            self.unshuffle(current);
        } else {
            self.shuffle(current);
        }
        self.shuffled
    }

    fn shuffle(&mut self, current: Option<&TrackId>) {
        self.original_order = self.tracks.clone();

        let mut shuffled = shuffled_copy(&self.tracks);

        if let Some(id) = current {
            if let Some(pos) = shuffled.iter().position(|t| &t.id == id) {
                if pos != self.index {
                    let track = shuffled.remove(pos);
                    let insert = self.index.min(shuffled.len());
                    shuffled.insert(insert, track);
                    self.index = insert;
                }
            }
        }

        self.tracks = shuffled;
        self.shuffled = true;
    }

    fn unshuffle(&mut self, current: Option<&TrackId>) {
        if self.original_order.is_empty() {
            self.shuffled = false;
            return;
        }

        let restored = std::mem::take(&mut self.original_order);

        let found = current.and_then(|id| restored.iter().position(|t| &t.id == id));
        self.index = match found {
            Some(pos) => pos,
            None => self.fallback_index(&restored),
        };

        self.tracks = restored;
        self.shuffled = false;
    }

    /// Heuristic for a current track missing from the restored order: map
    /// the *next* shuffled track back into the original order and sit one
    /// slot before it, so the following "next" lands there.
    fn fallback_index(&self, restored: &[Track]) -> usize {
        if self.tracks.is_empty() || restored.is_empty() {
            return 0;
        }

        let next_shuffled = &self.tracks[(self.index + 1) % self.tracks.len()];
        match restored.iter().position(|t| t.id == next_shuffled.id) {
            Some(pos) => (pos + restored.len() - 1) % restored.len(),
            None => 0,
        }
    }

    #[cfg(test)]
    pub fn original_order(&self) -> &[Track] {
        &self.original_order
    }
}
