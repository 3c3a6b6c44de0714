//! Domain models for the song catalog
//!
//! A [`Song`] is immutable once constructed and identified solely by its
//! [`SongId`]. Like/dislike state is deliberately absent: it lives in the
//! preference store and is looked up by id.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a song
///
/// Server ids are opaque strings; locally generated ids are UUID v4 strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(String);

impl SongId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier for songs that arrive without one.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SongId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SongId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for SongId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Song
// =============================================================================

/// A playable song
///
/// Equality and hashing consider only `id`: two values with the same id are
/// the same logical song even if their metadata differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    #[serde(default = "SongId::generate")]
    pub id: SongId,
    pub artist: String,
    pub title: String,
    /// Artwork URL
    #[serde(rename = "cover", default)]
    pub cover_url: String,
    /// Streamable audio URL; empty when the song cannot be played.
    #[serde(default)]
    pub audio_url: String,
}

impl Song {
    pub fn new(
        id: impl Into<SongId>,
        artist: impl Into<String>,
        title: impl Into<String>,
        cover_url: impl Into<String>,
        audio_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            artist: artist.into(),
            title: title.into(),
            cover_url: cover_url.into(),
            audio_url: audio_url.into(),
        }
    }

    /// Whether the song carries a URL the engine can load.
    pub fn has_audio(&self) -> bool {
        !self.audio_url.trim().is_empty()
    }

    /// Whether the song has display metadata worth acting on.
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    pub fn artwork_url(&self) -> Option<&str> {
        let url = self.cover_url.trim();
        (!url.is_empty()).then_some(url)
    }

    /// Validate song data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.as_str().trim().is_empty() {
            return Err("Song id cannot be empty".to_string());
        }

        if !self.has_title() {
            return Err(format!("Song {} has an empty title", self.id));
        }

        Ok(())
    }

    /// Sort key used for case-insensitive title ordering.
    pub fn title_sort_key(&self) -> String {
        self.title.to_lowercase()
    }
}

impl PartialEq for Song {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Song {}

impl Hash for Song {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
