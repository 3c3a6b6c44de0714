//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the player core and platform-specific
//! implementations. Each trait represents a capability that the core requires but
//! that must be implemented differently per platform (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry
//! - [`FileSystemAccess`](storage::FileSystemAccess) - File I/O for the media cache
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### Playback
//! - [`PlaybackEngine`](playback::PlaybackEngine) - Native audio engine control
//! - [`NowPlayingCenter`](media_session::NowPlayingCenter) - Lock screen / media overlay metadata and remote commands
//!
//! ### Remote services
//! - [`PreferenceApi`](remote::PreferenceApi) - Server-side like/dislike state
//!
//! ### Utilities
//! - [`LoggerSink`](log_sink::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | HTTP, settings, file system |
//! | iOS      | host app            | engine, now-playing, preference API |
//! | Android  | host app            | engine, now-playing, preference API |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is missing:
//!
//! ```ignore
//! let engine = config.playback_engine.clone().ok_or_else(|| Error::CapabilityMissing {
//!     capability: "PlaybackEngine".to_string(),
//!     message: "No playback engine provided. Inject the platform audio engine.".to_string(),
//! })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError` and
//! include context (paths, HTTP status) in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across async tasks.

pub mod error;
pub mod http;
pub mod log_sink;
pub mod media_session;
pub mod playback;
pub mod remote;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use log_sink::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media_session::{MediaCommand, NowPlayingCenter, NowPlayingInfo};
pub use playback::{
    engine_event_channel, EngineEvent, EngineEventReceiver, EngineEventSender, PlaybackEngine,
};
pub use remote::{PreferenceApi, SongLikeStatus};
pub use storage::{FileMetadata, FileSystemAccess, SettingsStore};
