//! URI resolution for heterogeneous track records
//!
//! The backend API stores the audio location under different field names
//! depending on deployment and upload path. Resolution walks a fixed,
//! prioritized candidate list and absolutizes relative paths against the
//! configured REST origin.

use crate::error::{PlayerError, Result};
use crate::types::Track;
use url::Url;

/// Candidate audio-location fields, highest priority first
pub const AUDIO_FIELD_CANDIDATES: &[&str] = &[
    "url",
    "audio_url",
    "audio_file_url",
    "stream_url",
    "audio_file",
    "audio",
    "file",
    "file_url",
    "src",
];

/// Resolves playable URLs from track records
///
/// Relative paths are joined to the base origin with exactly one slash.
/// Resolution never fails loudly; an unresolvable track is simply not
/// playable and reported as `None`.
#[derive(Debug, Clone)]
pub struct UriResolver {
    base: String,
}

impl UriResolver {
    /// Create a resolver for the given REST origin
    ///
    /// The origin must be an absolute http(s) URL. A trailing slash is
    /// stripped so joins are deterministic.
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| PlayerError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(PlayerError::InvalidBaseUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }

        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Find a playable URL for a track
    ///
    /// First non-empty candidate field wins. Returns `None` when no
    /// candidate resolves, signaling "not playable".
    pub fn resolve(&self, track: &Track) -> Option<String> {
        AUDIO_FIELD_CANDIDATES
            .iter()
            .find_map(|name| track.field_str(name))
            .map(|value| self.make_absolute(value))
    }

    /// Absolutize a track's artwork location, if it has one
    pub fn resolve_artwork(&self, track: &Track) -> Option<String> {
        match track.artwork.as_deref() {
            Some(value) if !value.is_empty() => Some(self.make_absolute(value)),
            _ => None,
        }
    }

    fn make_absolute(&self, value: &str) -> String {
        if value.starts_with("http://") || value.starts_with("https://") {
            return value.to_string();
        }

        let path = value.trim_start_matches('/');
        format!("{}/{}", self.base, path)
    }
}
