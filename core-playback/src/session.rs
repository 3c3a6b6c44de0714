//! # Playback Session
//!
//! [`PlaybackSession`] is the command surface of the player. It composes the
//! [`PlaylistSequencer`], the shared [`PreferenceStore`] and the host
//! [`PlaybackEngine`], and republishes one consolidated snapshot after every
//! command.
//!
//! The session is single-owner: commands take `&mut self` and are expected to
//! run on one task (see `core-service`'s runner), with engine callbacks fed in
//! through [`handle_engine_event`](PlaybackSession::handle_engine_event).
//! Only preference reconciliation leaves that task, via `tokio::spawn`.
//!
//! ## Publishing
//!
//! Each state-affecting command emits exactly one
//! [`PlaybackEvent::StateChanged`]. Commands that change what or how audio is
//! playing also push [`NowPlayingInfo`] to the media-control surface.

use std::future::Future;
use std::sync::Arc;

use bridge_traits::media_session::{NowPlayingCenter, NowPlayingInfo};
use bridge_traits::playback::{EngineEvent, PlaybackEngine};
use core_library::models::Song;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, PlaybackStatus};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{PlaybackError, Result};
use crate::format::{format_time, progress, to_millis};
use crate::preferences::{PreferenceAction, PreferenceStore};
use crate::sequencer::{PlaylistSequencer, RepeatMode};

// ============================================================================
// Snapshot
// ============================================================================

/// Observable session state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub current_song: Option<Song>,
    /// Playlist in active (possibly shuffled) order.
    pub playlist: Vec<Song>,
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub is_shuffling: bool,
    pub repeat_mode: RepeatMode,
    pub is_liked: bool,
    pub is_disliked: bool,
}

impl PlaybackSnapshot {
    /// Bus representation of this snapshot.
    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            song_id: self.current_song.as_ref().map(|s| s.id.to_string()),
            title: self.current_song.as_ref().map(|s| s.title.clone()),
            artist: self.current_song.as_ref().map(|s| s.artist.clone()),
            current_index: self.current_index,
            playlist_len: self.playlist.len(),
            is_playing: self.is_playing,
            position_ms: to_millis(self.current_time),
            duration_ms: to_millis(self.duration),
            is_shuffling: self.is_shuffling,
            repeat_mode: self.repeat_mode.into(),
            is_liked: self.is_liked,
            is_disliked: self.is_disliked,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Playback orchestrator.
pub struct PlaybackSession {
    sequencer: PlaylistSequencer,
    preferences: Arc<PreferenceStore>,
    engine: Arc<dyn PlaybackEngine>,
    now_playing: Option<Arc<dyn NowPlayingCenter>>,
    event_bus: EventBus,
    user_id: Option<String>,
    /// Last song handed to the engine, kept for `play()` after a reset.
    last_song: Option<Song>,
    track_loaded: bool,
    is_playing: bool,
    current_time: f64,
    duration: f64,
}

impl PlaybackSession {
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        preferences: Arc<PreferenceStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            sequencer: PlaylistSequencer::new(),
            preferences,
            engine,
            now_playing: None,
            event_bus,
            user_id: None,
            last_song: None,
            track_loaded: false,
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
        }
    }

    pub fn with_now_playing(mut self, now_playing: Arc<dyn NowPlayingCenter>) -> Self {
        self.now_playing = Some(now_playing);
        self
    }

    /// Replace the sequencer, e.g. with a seeded one.
    pub fn with_sequencer(mut self, sequencer: PlaylistSequencer) -> Self {
        self.sequencer = sequencer;
        self
    }

    // ========================================================================
    // Song Selection
    // ========================================================================

    /// Play `song` within `context`.
    ///
    /// An empty or missing context keeps the current playlist, or starts a
    /// single-song playlist when none exists.
    pub fn play_song(&mut self, song: Song, context: Option<Vec<Song>>) {
        let playlist = match context {
            Some(songs) if !songs.is_empty() => songs,
            _ if !self.sequencer.original_order().is_empty() => {
                self.sequencer.original_order().to_vec()
            }
            _ => vec![song.clone()],
        };

        self.sequencer.configure(playlist, &song);
        self.load_current();
        self.publish_playback();
    }

    /// Play by position, optionally replacing the playlist first.
    ///
    /// Returns `false` and changes nothing when `index` is out of range.
    pub fn play_at(&mut self, index: usize, playlist: Option<Vec<Song>>) -> bool {
        let selected = match playlist {
            Some(songs) => self.sequencer.configure_at(songs, index),
            None => self.sequencer.set_current_index(index),
        };

        if !selected {
            debug!(index, "Ignoring out-of-range play request");
            return false;
        }

        self.load_current();
        self.publish_playback();
        true
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Resume playback, loading a track first if none is attached.
    pub fn play(&mut self) {
        if !self.track_loaded {
            if self.sequencer.current_index().is_none() {
                if !self.sequencer.is_empty() {
                    self.sequencer.set_current_index(0);
                } else if let Some(song) = self.last_song.clone() {
                    self.sequencer.configure(Vec::new(), &song);
                } else {
                    debug!("Nothing to play");
                    return;
                }
            }
            self.load_current();
        } else {
            self.engine.play();
            self.is_playing = true;
        }

        self.publish_playback();
    }

    pub fn pause(&mut self) {
        if self.track_loaded {
            self.engine.pause();
        }
        self.is_playing = false;
        self.publish_playback();
    }

    pub fn toggle_play_pause(&mut self) {
        if self.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Advance to the next track.
    ///
    /// `auto_advance` marks the end of the current track. When the sequencer
    /// has nothing left the session pauses.
    pub fn play_next(&mut self, auto_advance: bool) {
        match self.sequencer.next_index(auto_advance) {
            Some(index) => self.jump_to(index),
            None => {
                info!("Reached end of playlist");
                self.pause();
            }
        }
    }

    pub fn play_previous(&mut self) {
        if let Some(index) = self.sequencer.previous_index() {
            self.jump_to(index);
        }
    }

    /// Seek within the current track, clamped to `[0, duration]`.
    pub fn seek(&mut self, time: f64) {
        if !time.is_finite() {
            return;
        }

        let target = time.clamp(0.0, self.duration.max(0.0));
        if self.track_loaded {
            self.engine.seek(target);
        }
        self.current_time = target;
        self.publish_playback();
    }

    fn jump_to(&mut self, index: usize) {
        if self.track_loaded && self.sequencer.current_index() == Some(index) {
            // Same track again (repeat one, or a one-song playlist)
            self.engine.seek(0.0);
            self.engine.play();
            self.current_time = 0.0;
            self.is_playing = true;
        } else {
            self.sequencer.set_current_index(index);
            self.load_current();
        }
        self.publish_playback();
    }

    // ========================================================================
    // Modes
    // ========================================================================

    pub fn toggle_shuffle(&mut self) {
        self.sequencer.toggle_shuffle();
        self.publish();
    }

    pub fn cycle_repeat_mode(&mut self) {
        let mode = self.sequencer.cycle_repeat_mode();
        debug!(%mode, "Repeat mode changed");
        self.publish();
    }

    /// Restore saved shuffle and repeat settings.
    pub fn restore_modes(&mut self, shuffle: bool, repeat_mode: RepeatMode) {
        self.sequencer.set_shuffling(shuffle);
        self.sequencer.set_repeat_mode(repeat_mode);
        self.publish();
    }

    // ========================================================================
    // Preferences
    // ========================================================================

    /// Optimistically like the current song and reconcile in the background.
    ///
    /// Returns the reconciliation task, or `None` when no song is loaded.
    pub fn toggle_like(&mut self) -> Option<JoinHandle<()>> {
        self.toggle_preference(PreferenceAction::Like)
    }

    /// Optimistically dislike the current song and reconcile in the background.
    pub fn toggle_dislike(&mut self) -> Option<JoinHandle<()>> {
        self.toggle_preference(PreferenceAction::Dislike)
    }

    fn toggle_preference(&mut self, action: PreferenceAction) -> Option<JoinHandle<()>> {
        let song = self
            .sequencer
            .current_song()
            .filter(|song| song.has_title())?
            .clone();

        let previous = match action {
            PreferenceAction::Like => self.preferences.toggle_like_local(&song.id),
            PreferenceAction::Dislike => self.preferences.toggle_dislike_local(&song.id),
        };
        self.publish();

        let store = Arc::clone(&self.preferences);
        let user_id = self.user_id.clone();
        self.spawn(async move {
            store
                .reconcile(action, &song.id, user_id.as_deref(), previous)
                .await;
        })
    }

    /// Set the signed-in user used for reconciliation.
    ///
    /// Signing in refreshes the current song's status from the server.
    pub fn set_user_id(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
        if let Some(song) = self.sequencer.current_song().cloned() {
            self.spawn_status_check(&song);
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn spawn_status_check(&self, song: &Song) -> Option<JoinHandle<()>> {
        let user_id = self.user_id.clone()?;
        if !self.preferences.has_remote() {
            return None;
        }

        let store = Arc::clone(&self.preferences);
        let id = song.id.clone();
        self.spawn(async move {
            store.check_status(&id, Some(&user_id)).await;
        })
    }

    fn spawn<F>(&self, task: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match Handle::try_current() {
            Ok(handle) => Some(handle.spawn(task)),
            Err(_) => {
                warn!("No async runtime available; skipping preference sync");
                None
            }
        }
    }

    // ========================================================================
    // Engine Events
    // ========================================================================

    /// Apply a callback from the host engine.
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::TimeUpdated(time) => {
                if time.is_finite() {
                    self.current_time = time.max(0.0);
                    self.publish();
                }
            }
            EngineEvent::DurationUpdated(duration) => {
                if duration.is_finite() {
                    self.duration = duration.max(0.0);
                    self.publish_playback();
                }
            }
            EngineEvent::PlaybackStateChanged(is_playing) => {
                if self.is_playing != is_playing {
                    self.is_playing = is_playing;
                    self.publish_playback();
                }
            }
            EngineEvent::Finished => {
                if !self.track_loaded {
                    debug!("Ignoring finish event with no track loaded");
                    return;
                }
                if let Some(song) = self.sequencer.current_song() {
                    self.emit(PlaybackEvent::Completed {
                        song_id: song.id.to_string(),
                    });
                }
                self.play_next(true);
            }
        }
    }

    // ========================================================================
    // Derived State
    // ========================================================================

    pub fn current_song(&self) -> Option<&Song> {
        self.sequencer.current_song()
    }

    pub fn sequencer(&self) -> &PlaylistSequencer {
        &self.sequencer
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn progress(&self) -> f64 {
        progress(self.current_time, self.duration)
    }

    pub fn formatted_current_time(&self) -> String {
        format_time(self.current_time)
    }

    pub fn formatted_duration(&self) -> String {
        format_time(self.duration)
    }

    pub fn formatted_remaining_time(&self) -> String {
        format_time((self.duration - self.current_time).max(0.0))
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let current_song = self.sequencer.current_song().cloned();
        let preference = current_song
            .as_ref()
            .map(|song| self.preferences.preference(&song.id))
            .unwrap_or_default();

        PlaybackSnapshot {
            current_song,
            playlist: self.sequencer.active_order().to_vec(),
            current_index: self.sequencer.current_index(),
            is_playing: self.is_playing,
            current_time: self.current_time,
            duration: self.duration,
            is_shuffling: self.sequencer.is_shuffling(),
            repeat_mode: self.sequencer.repeat_mode(),
            is_liked: preference.is_liked(),
            is_disliked: preference.is_disliked(),
        }
    }

    /// Emit the current snapshot without touching the media-control surface.
    pub fn publish(&self) {
        self.emit(PlaybackEvent::StateChanged(self.snapshot().status()));
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Tear down the engine and attach the sequencer's current song.
    fn load_current(&mut self) {
        let Some(song) = self.sequencer.current_song().cloned() else {
            return;
        };

        self.engine.stop();
        self.track_loaded = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.last_song = Some(song.clone());

        match self.attach(&song) {
            Ok(()) => {
                self.engine.play();
                self.track_loaded = true;
                self.is_playing = true;
                info!(song_id = %song.id, url = %song.audio_url, "Loaded track");
                self.emit(PlaybackEvent::TrackChanged {
                    song_id: song.id.to_string(),
                    title: song.title.clone(),
                    index: self.sequencer.current_index().unwrap_or_default(),
                });
            }
            Err(error) => {
                warn!(song_id = %song.id, %error, "Could not load track");
                self.is_playing = false;
                self.emit(PlaybackEvent::Error {
                    song_id: Some(song.id.to_string()),
                    message: error.to_string(),
                    recoverable: true,
                });
            }
        }

        self.spawn_status_check(&song);
    }

    fn attach(&self, song: &Song) -> Result<()> {
        if !song.has_audio() {
            return Err(PlaybackError::MissingAudioUrl(song.id.to_string()));
        }
        self.engine.load(song.audio_url.trim())?;
        Ok(())
    }

    fn publish_playback(&self) {
        let snapshot = self.snapshot();
        self.push_now_playing(&snapshot);
        self.emit(PlaybackEvent::StateChanged(snapshot.status()));
    }

    fn push_now_playing(&self, snapshot: &PlaybackSnapshot) {
        let (Some(center), Some(song)) = (&self.now_playing, &snapshot.current_song) else {
            return;
        };

        center.update(NowPlayingInfo {
            title: song.title.clone(),
            artist: song.artist.clone(),
            artwork_url: song.artwork_url().map(str::to_string),
            duration: snapshot.duration,
            position: snapshot.current_time,
            is_playing: snapshot.is_playing,
        });
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is not an error for the session.
        self.event_bus.emit(CoreEvent::Playback(event)).ok();
    }
}
