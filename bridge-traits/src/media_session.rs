//! Now-playing and remote media control bridge.
//!
//! Hosts surface track metadata on lock screens, notification shades or OS
//! media overlays, and forward hardware/remote buttons back to the core as
//! [`MediaCommand`]s.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Metadata pushed to the platform's now-playing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingInfo {
    pub title: String,
    pub artist: String,
    /// Remote artwork URL; hosts fetch and render it themselves.
    pub artwork_url: Option<String>,
    /// Seconds.
    pub duration: f64,
    /// Seconds.
    pub position: f64,
    pub is_playing: bool,
}

impl NowPlayingInfo {
    /// Playback rate as reported to media centres (`1.0` playing, `0.0` paused).
    pub fn playback_rate(&self) -> f64 {
        if self.is_playing {
            1.0
        } else {
            0.0
        }
    }
}

/// Command issued from a remote control surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MediaCommand {
    Play,
    Pause,
    TogglePlayPause,
    Next,
    Previous,
    /// Absolute position in seconds.
    Seek(f64),
    Like,
    Dislike,
}

/// Platform now-playing centre.
pub trait NowPlayingCenter: Send + Sync {
    /// Replace the displayed metadata.
    fn update(&self, info: NowPlayingInfo);

    /// Remove any displayed metadata.
    fn clear(&self);

    /// Install the channel remote commands are delivered on.
    fn register_command_handler(&self, commands: mpsc::UnboundedSender<MediaCommand>);
}
