//! # Session Runner
//!
//! One task owns the [`PlaybackSession`]. User commands (through
//! [`SessionHandle`]), engine callbacks, media-control commands and settled
//! preference events all arrive as messages, so they interleave only at
//! message boundaries and never touch the session concurrently.
//!
//! The runner exits when every [`SessionHandle`] is dropped or on
//! [`SessionHandle::shutdown`].

use std::sync::Arc;

use bridge_traits::media_session::MediaCommand;
use bridge_traits::playback::EngineEventReceiver;
use bridge_traits::storage::SettingsStore;
use core_library::models::Song;
use core_playback::{PlaybackSession, PlaybackSnapshot, RepeatMode};
use core_runtime::events::{CoreEvent, PreferenceEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};

/// Settings key for the saved shuffle flag.
pub const SHUFFLE_KEY: &str = "playback.shuffle";
/// Settings key for the saved repeat mode.
pub const REPEAT_MODE_KEY: &str = "playback.repeat_mode";

// ============================================================================
// Commands
// ============================================================================

/// Messages accepted by the runner.
#[derive(Debug)]
pub enum SessionCommand {
    PlaySong {
        song: Song,
        context: Option<Vec<Song>>,
    },
    PlayAt {
        index: usize,
        playlist: Option<Vec<Song>>,
    },
    Play,
    Pause,
    TogglePlayPause,
    Next,
    Previous,
    Seek(f64),
    ToggleShuffle,
    CycleRepeatMode,
    ToggleLike,
    ToggleDislike,
    SetUser(Option<String>),
    Snapshot(oneshot::Sender<PlaybackSnapshot>),
    Shutdown,
}

impl From<MediaCommand> for SessionCommand {
    fn from(command: MediaCommand) -> Self {
        match command {
            MediaCommand::Play => SessionCommand::Play,
            MediaCommand::Pause => SessionCommand::Pause,
            MediaCommand::TogglePlayPause => SessionCommand::TogglePlayPause,
            MediaCommand::Next => SessionCommand::Next,
            MediaCommand::Previous => SessionCommand::Previous,
            MediaCommand::Seek(position) => SessionCommand::Seek(position),
            MediaCommand::Like => SessionCommand::ToggleLike,
            MediaCommand::Dislike => SessionCommand::ToggleDislike,
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable command surface for the session task.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Create a handle and the receiver to give to a [`SessionRunner`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn send(&self, command: SessionCommand) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| CoreError::SessionClosed)
    }

    pub fn play_song(&self, song: Song, context: Option<Vec<Song>>) -> Result<()> {
        self.send(SessionCommand::PlaySong { song, context })
    }

    pub fn play_at(&self, index: usize, playlist: Option<Vec<Song>>) -> Result<()> {
        self.send(SessionCommand::PlayAt { index, playlist })
    }

    pub fn play(&self) -> Result<()> {
        self.send(SessionCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(SessionCommand::Pause)
    }

    pub fn toggle_play_pause(&self) -> Result<()> {
        self.send(SessionCommand::TogglePlayPause)
    }

    pub fn next(&self) -> Result<()> {
        self.send(SessionCommand::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.send(SessionCommand::Previous)
    }

    pub fn seek(&self, seconds: f64) -> Result<()> {
        self.send(SessionCommand::Seek(seconds))
    }

    pub fn toggle_shuffle(&self) -> Result<()> {
        self.send(SessionCommand::ToggleShuffle)
    }

    pub fn cycle_repeat_mode(&self) -> Result<()> {
        self.send(SessionCommand::CycleRepeatMode)
    }

    pub fn toggle_like(&self) -> Result<()> {
        self.send(SessionCommand::ToggleLike)
    }

    pub fn toggle_dislike(&self) -> Result<()> {
        self.send(SessionCommand::ToggleDislike)
    }

    pub fn set_user(&self, user_id: Option<String>) -> Result<()> {
        self.send(SessionCommand::SetUser(user_id))
    }

    /// Current session state, after every previously sent command.
    pub async fn snapshot(&self) -> Result<PlaybackSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::Snapshot(reply))?;
        response.await.map_err(|_| CoreError::SessionClosed)
    }

    /// Ask the runner to stop after the commands already queued.
    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown)
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Main-context loop owning the session.
pub struct SessionRunner {
    session: PlaybackSession,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    engine_events: EngineEventReceiver,
    bus_events: broadcast::Receiver<CoreEvent>,
    media_commands: Option<mpsc::UnboundedReceiver<MediaCommand>>,
    settings: Option<Arc<dyn SettingsStore>>,
}

impl SessionRunner {
    pub fn new(
        session: PlaybackSession,
        commands: mpsc::UnboundedReceiver<SessionCommand>,
        engine_events: EngineEventReceiver,
        bus_events: broadcast::Receiver<CoreEvent>,
    ) -> Self {
        Self {
            session,
            commands,
            engine_events,
            bus_events,
            media_commands: None,
            settings: None,
        }
    }

    /// Accept remote commands from the media-control surface.
    pub fn with_media_commands(mut self, receiver: mpsc::UnboundedReceiver<MediaCommand>) -> Self {
        self.media_commands = Some(receiver);
        self
    }

    /// Save shuffle and repeat changes to `settings`.
    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub async fn run(mut self) {
        let mut engine_open = true;
        let mut bus_open = true;
        let mut media_open = self.media_commands.is_some();

        info!("Playback session started");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(command) => self.handle_command(command).await,
                    }
                }
                event = self.engine_events.recv(), if engine_open => {
                    match event {
                        Some(event) => self.session.handle_engine_event(event),
                        None => {
                            warn!("Engine event channel closed");
                            engine_open = false;
                        }
                    }
                }
                command = recv_media(&mut self.media_commands), if media_open => {
                    match command {
                        Some(command) => {
                            debug!(?command, "Media command");
                            self.handle_command(command.into()).await;
                        }
                        None => media_open = false,
                    }
                }
                event = self.bus_events.recv(), if bus_open => {
                    match event {
                        Ok(CoreEvent::Preference(event)) => self.handle_preference_event(&event),
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Session runner lagged behind the event bus");
                        }
                        Err(RecvError::Closed) => bus_open = false,
                    }
                }
            }
        }

        info!("Playback session stopped");
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::PlaySong { song, context } => self.session.play_song(song, context),
            SessionCommand::PlayAt { index, playlist } => {
                self.session.play_at(index, playlist);
            }
            SessionCommand::Play => self.session.play(),
            SessionCommand::Pause => self.session.pause(),
            SessionCommand::TogglePlayPause => self.session.toggle_play_pause(),
            SessionCommand::Next => self.session.play_next(false),
            SessionCommand::Previous => self.session.play_previous(),
            SessionCommand::Seek(seconds) => self.session.seek(seconds),
            SessionCommand::ToggleShuffle => {
                self.session.toggle_shuffle();
                self.persist_modes().await;
            }
            SessionCommand::CycleRepeatMode => {
                self.session.cycle_repeat_mode();
                self.persist_modes().await;
            }
            SessionCommand::ToggleLike => {
                self.session.toggle_like();
            }
            SessionCommand::ToggleDislike => {
                self.session.toggle_dislike();
            }
            SessionCommand::SetUser(user_id) => self.session.set_user_id(user_id),
            SessionCommand::Snapshot(reply) => {
                reply.send(self.session.snapshot()).ok();
            }
            SessionCommand::Shutdown => {}
        }
    }

    /// Republish once a round-trip for the current song has settled.
    fn handle_preference_event(&self, event: &PreferenceEvent) {
        if !event.is_settled() {
            return;
        }

        let is_current = self
            .session
            .current_song()
            .is_some_and(|song| song.id.as_str() == event.song_id());
        if is_current {
            self.session.publish();
        }
    }

    async fn persist_modes(&self) {
        let Some(settings) = &self.settings else {
            return;
        };

        let sequencer = self.session.sequencer();
        let shuffle = sequencer.is_shuffling();
        let repeat = sequencer.repeat_mode();

        let result = async {
            settings.set_bool(SHUFFLE_KEY, shuffle).await?;
            settings.set_string(REPEAT_MODE_KEY, repeat.as_str()).await
        }
        .await;

        if let Err(error) = result {
            warn!(%error, "Failed to save playback settings");
        }
    }
}

async fn recv_media(
    receiver: &mut Option<mpsc::UnboundedReceiver<MediaCommand>>,
) -> Option<MediaCommand> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => None,
    }
}

/// Read saved shuffle and repeat settings, defaulting on missing or bad values.
pub async fn load_playback_modes(settings: &dyn SettingsStore) -> (bool, RepeatMode) {
    let shuffle = match settings.get_bool(SHUFFLE_KEY).await {
        Ok(value) => value.unwrap_or(false),
        Err(error) => {
            warn!(%error, "Could not read saved shuffle setting");
            false
        }
    };

    let repeat = match settings.get_string(REPEAT_MODE_KEY).await {
        Ok(Some(raw)) => raw.parse().unwrap_or_else(|error| {
            warn!(%error, "Ignoring saved repeat mode");
            RepeatMode::None
        }),
        Ok(None) => RepeatMode::None,
        Err(error) => {
            warn!(%error, "Could not read saved repeat mode");
            RepeatMode::None
        }
    };

    (shuffle, repeat)
}
