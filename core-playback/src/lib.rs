//! # Playback Session Module
//!
//! The playback core of the player: what plays next, what the user thinks of
//! it, and the session that drives the host engine.
//!
//! ## Overview
//!
//! This module handles:
//! - Playlist sequencing with shuffle pinning and repeat policy
//! - Like/dislike preferences with optimistic updates and server reconciliation
//! - The playback session façade and its published snapshots
//! - Time formatting for now-playing displays

pub mod error;
pub mod format;
pub mod preferences;
pub mod sequencer;
pub mod session;

pub use error::{PlaybackError, Result};
pub use format::{format_time, progress};
pub use preferences::{
    PreferenceAction, PreferenceSet, PreferenceStore, SongPreference, DISLIKED_SONGS_KEY,
    LIKED_SONGS_KEY,
};
pub use sequencer::{PlaylistSequencer, RepeatMode};
pub use session::{PlaybackSession, PlaybackSnapshot};
