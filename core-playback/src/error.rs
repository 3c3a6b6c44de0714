//! # Playback Error Types
//!
//! Errors raised inside the session core. None of them are fatal: callers
//! degrade to the last known good local state and log.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback and preference operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// Song has no audio URL the engine could load.
    #[error("Song {0} has no audio URL")]
    MissingAudioUrl(String),

    /// Host engine refused or failed an operation.
    #[error("Playback engine error: {0}")]
    Engine(String),

    // ========================================================================
    // Preference Errors
    // ========================================================================
    /// Remote like/dislike call or status fetch failed.
    #[error("Preference sync failed for {song_id}: {message}")]
    PreferenceSync { song_id: String, message: String },

    /// Persisted preference data could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Bridge capability failed.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
