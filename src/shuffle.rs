//! Queue randomization
//!
//! Fisher–Yates shuffle with bounded rejection of no-op permutations, so a
//! small queue never visibly "shuffles" into the exact same order.

use crate::types::Track;
use rand::rngs::{OsRng, StdRng};
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Produce a shuffled copy of the queue
///
/// Uses an OS-entropy-seeded generator, falling back to thread-local
/// entropy if the OS source is unavailable. If the permutation comes out
/// identical to the input it is rejected and redrawn: one retry for queues
/// longer than 3 tracks, up to three for shorter ones. A length-2 queue can
/// still exhaust the retry budget (only two permutations exist).
pub(crate) fn shuffled_copy(tracks: &[Track]) -> Vec<Track> {
    if tracks.len() <= 1 {
        return tracks.to_vec();
    }

    let mut rng = StdRng::from_rng(OsRng).unwrap_or_else(|_| StdRng::from_entropy());

    let mut shuffled = tracks.to_vec();
    shuffled.shuffle(&mut rng);

    let max_attempts = if tracks.len() > 3 { 1 } else { 3 };
    let mut attempts = 0;
    while attempts < max_attempts && same_order(&shuffled, tracks) {
        shuffled.shuffle(&mut rng);
        attempts += 1;
    }

    shuffled
}

/// Element-for-element identity comparison by track id
pub(crate) fn same_order(a: &[Track], b: &[Track]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.id == y.id)
}
