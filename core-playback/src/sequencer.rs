//! # Playlist Sequencing
//!
//! [`PlaylistSequencer`] owns the playlist and answers "what plays next" under
//! shuffle and repeat policy.
//!
//! Two views of the playlist are kept: the caller's `original_order` and the
//! `active_order` actually played. With shuffle on, the active order is a
//! random permutation of the original with the playing song pinned at index 0,
//! so toggling shuffle never interrupts the current track. Turning shuffle off
//! restores the original order as supplied, without re-sorting.
//!
//! Out-of-range requests never panic; they are reported through return values.

use std::fmt;
use std::str::FromStr;

use core_library::models::{Song, SongId};
use core_runtime::events::RepeatModeKind;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

// ============================================================================
// Repeat Mode
// ============================================================================

/// Repeat policy applied when a track ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    /// Stop at the end of the playlist
    #[default]
    None,
    /// Loop the whole playlist
    All,
    /// Replay the current track
    One,
}

impl RepeatMode {
    /// Next mode in the `None → All → One → None` cycle.
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::None => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::None => "none",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepeatMode {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(RepeatMode::None),
            "all" => Ok(RepeatMode::All),
            "one" => Ok(RepeatMode::One),
            other => Err(PlaybackError::Internal(format!(
                "unknown repeat mode '{}'",
                other
            ))),
        }
    }
}

impl From<RepeatMode> for RepeatModeKind {
    fn from(mode: RepeatMode) -> Self {
        match mode {
            RepeatMode::None => RepeatModeKind::None,
            RepeatMode::All => RepeatModeKind::All,
            RepeatMode::One => RepeatModeKind::One,
        }
    }
}

// ============================================================================
// Sequencer
// ============================================================================

/// Ordered playlist with shuffle and repeat policy.
pub struct PlaylistSequencer {
    original_order: Vec<Song>,
    active_order: Vec<Song>,
    current_index: Option<usize>,
    is_shuffling: bool,
    repeat_mode: RepeatMode,
    rng: StdRng,
}

impl PlaylistSequencer {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Sequencer whose shuffles are reproducible for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            original_order: Vec::new(),
            active_order: Vec::new(),
            current_index: None,
            is_shuffling: false,
            repeat_mode: RepeatMode::None,
            rng,
        }
    }

    /// Replace the playlist and select `selected`.
    ///
    /// `selected` is appended when `songs` does not contain it, which also
    /// turns an empty list into `[selected]`.
    pub fn configure(&mut self, songs: Vec<Song>, selected: &Song) {
        let mut songs = songs;
        if !songs.iter().any(|song| song.id == selected.id) {
            songs.push(selected.clone());
        }

        self.original_order = songs;
        self.rebuild_active_order(&selected.id);
    }

    /// Replace the playlist and select the entry at `index`.
    ///
    /// Returns `false` without touching state when `index` is out of range.
    /// With shuffle off the exact entry is selected even if its id repeats.
    pub fn configure_at(&mut self, songs: Vec<Song>, index: usize) -> bool {
        let Some(selected) = songs.get(index).cloned() else {
            return false;
        };

        self.configure(songs, &selected);
        if !self.is_shuffling {
            self.current_index = Some(index);
        }
        true
    }

    pub fn set_current_index(&mut self, index: usize) -> bool {
        if index >= self.active_order.len() {
            return false;
        }
        self.current_index = Some(index);
        true
    }

    /// Index to play after the current one, or `None` when playback should stop.
    ///
    /// `auto_advance` marks a request coming from the end of a track rather
    /// than a user skip.
    pub fn next_index(&self, auto_advance: bool) -> Option<usize> {
        let current = self.current_index?;
        let len = self.active_order.len();
        if len == 0 {
            return None;
        }

        if auto_advance && self.repeat_mode == RepeatMode::One {
            return Some(current);
        }

        let next = current + 1;
        if next < len {
            return Some(next);
        }

        if !auto_advance {
            return Some(0);
        }

        match self.repeat_mode {
            RepeatMode::None => None,
            RepeatMode::All | RepeatMode::One => Some(0),
        }
    }

    /// Index before the current one, wrapping to the last track.
    pub fn previous_index(&self) -> Option<usize> {
        let len = self.active_order.len();
        if len == 0 {
            return None;
        }

        match self.current_index {
            Some(current) if current > 0 => Some(current - 1),
            _ => Some(len - 1),
        }
    }

    /// Flip shuffle, keeping the playing song current. No-op with nothing selected.
    pub fn toggle_shuffle(&mut self) {
        let Some(current) = self.current_song().map(|song| song.id.clone()) else {
            return;
        };

        self.is_shuffling = !self.is_shuffling;
        self.rebuild_active_order(&current);
    }

    /// Force the shuffle flag, e.g. when restoring saved settings.
    ///
    /// Unlike [`toggle_shuffle`](Self::toggle_shuffle) this works before any
    /// playlist is loaded.
    pub fn set_shuffling(&mut self, enabled: bool) {
        if self.is_shuffling == enabled {
            return;
        }

        match self.current_song().map(|song| song.id.clone()) {
            Some(current) => {
                self.is_shuffling = enabled;
                self.rebuild_active_order(&current);
            }
            None => self.is_shuffling = enabled,
        }
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.repeat_mode = self.repeat_mode.cycle();
        self.repeat_mode
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_song(&self) -> Option<&Song> {
        self.current_index.and_then(|index| self.active_order.get(index))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn song_at(&self, index: usize) -> Option<&Song> {
        self.active_order.get(index)
    }

    pub fn active_order(&self) -> &[Song] {
        &self.active_order
    }

    pub fn original_order(&self) -> &[Song] {
        &self.original_order
    }

    pub fn len(&self) -> usize {
        self.active_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_order.is_empty()
    }

    pub fn is_shuffling(&self) -> bool {
        self.is_shuffling
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    fn rebuild_active_order(&mut self, pinned: &SongId) {
        if self.is_shuffling {
            let mut order = self.original_order.clone();
            order.shuffle(&mut self.rng);
            if let Some(position) = order.iter().position(|song| &song.id == pinned) {
                let song = order.remove(position);
                order.insert(0, song);
            }
            self.active_order = order;
        } else {
            self.active_order = self.original_order.clone();
        }

        self.current_index = self
            .active_order
            .iter()
            .position(|song| &song.id == pinned);
    }
}

impl Default for PlaylistSequencer {
    fn default() -> Self {
        Self::new()
    }
}
