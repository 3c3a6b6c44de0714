//! # Event Bus System
//!
//! Provides an event-driven architecture for the player core using `tokio::sync::broadcast`.
//! This module enables decoupled communication between the playback session, the
//! preference store, the catalog and any presentation layer through typed events.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for each domain
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  emit   ┌───────────┐
//! │ PlaybackSession  ├────────>│           │
//! └──────────────────┘         │           │  subscribe  ┌──────────────┐
//! ┌──────────────────┐  emit   │ EventBus  ├────────────>│ UI / host    │
//! │ PreferenceStore  ├────────>│ (broadcast│             └──────────────┘
//! └──────────────────┘         │  channel) │  subscribe  ┌──────────────┐
//! ┌──────────────────┐  emit   │           ├────────────>│ SessionRunner│
//! │ CatalogService   ├────────>│           │             └──────────────┘
//! └──────────────────┘         └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PreferenceEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Preference(PreferenceEvent::Toggled {
//!         song_id: "sample-1".to_string(),
//!         is_liked: true,
//!         is_disliked: false,
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Preference(_)));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Emitting with no subscribers returns an error; publishers treat that as a no-op.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback session state and track lifecycle
    Playback(PlaybackEvent),
    /// Like/dislike changes
    Preference(PreferenceEvent),
    /// Catalog and media cache
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Human-readable description of the event
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Preference(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Severity level, used by hosts to route events to logs or UI.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Preference(PreferenceEvent::RolledBack { .. }) => EventSeverity::Warning,
            CoreEvent::Library(LibraryEvent::CatalogLoaded {
                from_fallback: true,
                ..
            }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::TrackChanged { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::CatalogLoaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Repeat policy as carried on the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatModeKind {
    #[default]
    None,
    All,
    One,
}

/// Consolidated observable session state, published after every command.
///
/// Times are carried in milliseconds so the event stays `Eq`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub song_id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    /// Position in the active (possibly shuffled) order.
    pub current_index: Option<usize>,
    pub playlist_len: usize,
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_shuffling: bool,
    pub repeat_mode: RepeatModeKind,
    pub is_liked: bool,
    pub is_disliked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Full snapshot after a state-affecting command.
    StateChanged(PlaybackStatus),
    /// A new song was attached to the engine.
    TrackChanged {
        song_id: String,
        title: String,
        index: usize,
    },
    /// The engine reported the end of a song.
    Completed { song_id: String },
    Error {
        song_id: Option<String>,
        message: String,
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StateChanged(_) => "Playback state changed",
            PlaybackEvent::TrackChanged { .. } => "Track changed",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Preference Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PreferenceEvent {
    /// Local optimistic flip applied.
    Toggled {
        song_id: String,
        is_liked: bool,
        is_disliked: bool,
    },
    /// Server state applied after a toggle.
    Reconciled {
        song_id: String,
        is_liked: bool,
        is_disliked: bool,
    },
    /// Remote toggle failed; local state restored.
    RolledBack {
        song_id: String,
        is_liked: bool,
        is_disliked: bool,
        message: String,
    },
    /// Server state fetched for a newly played song.
    StatusRefreshed {
        song_id: String,
        is_liked: bool,
        is_disliked: bool,
    },
}

impl PreferenceEvent {
    fn description(&self) -> &str {
        match self {
            PreferenceEvent::Toggled { .. } => "Preference toggled locally",
            PreferenceEvent::Reconciled { .. } => "Preference reconciled with server",
            PreferenceEvent::RolledBack { .. } => "Preference change rolled back",
            PreferenceEvent::StatusRefreshed { .. } => "Preference status refreshed",
        }
    }

    /// Song the event refers to
    pub fn song_id(&self) -> &str {
        match self {
            PreferenceEvent::Toggled { song_id, .. }
            | PreferenceEvent::Reconciled { song_id, .. }
            | PreferenceEvent::RolledBack { song_id, .. }
            | PreferenceEvent::StatusRefreshed { song_id, .. } => song_id,
        }
    }

    /// Whether the event ends an asynchronous round-trip.
    pub fn is_settled(&self) -> bool {
        !matches!(self, PreferenceEvent::Toggled { .. })
    }
}

// ============================================================================
// Library Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    All,
    Images,
    Audio,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    CatalogLoaded {
        song_count: usize,
        /// Remote fetch failed or returned nothing; bundled songs are in use.
        from_fallback: bool,
    },
    CacheCleared {
        scope: CacheScope,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::CatalogLoaded {
                from_fallback: false,
                ..
            } => "Catalog loaded",
            LibraryEvent::CatalogLoaded {
                from_fallback: true,
                ..
            } => "Catalog loaded from bundled defaults",
            LibraryEvent::CacheCleared { .. } => "Media cache cleared",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to core events.
///
/// Cloning is cheap; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0; `CoreConfig::validate` rejects that value.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers, returning how many received it.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver wrapper that skips events not matching a predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let stream = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Preference(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Waits for the next matching event.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns the next buffered matching event, or `None` if none is buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn toggled(song_id: &str) -> CoreEvent {
        CoreEvent::Preference(PreferenceEvent::Toggled {
            song_id: song_id.to_string(),
            is_liked: true,
            is_disliked: false,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(toggled("a")).is_err());
    }

    #[tokio::test]
    async fn test_event_emission_with_subscribers() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        assert_eq!(bus.emit(toggled("a")).unwrap(), 1);
        assert_eq!(sub.recv().await.unwrap(), toggled("a"));
    }

    #[tokio::test]
    async fn test_event_stream_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Preference(_)));

        bus.emit(CoreEvent::Library(LibraryEvent::CacheCleared {
            scope: CacheScope::All,
        }))
        .unwrap();
        bus.emit(toggled("b")).unwrap();

        assert_eq!(stream.recv().await.unwrap(), toggled("b"));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber_reports_missed_events() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());

        for id in ["a", "b", "c", "d"] {
            bus.emit(toggled(id)).unwrap();
        }

        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Lagged(2)))));
        assert_eq!(stream.try_recv().unwrap().unwrap(), toggled("c"));
    }

    #[test]
    fn test_event_severity() {
        let rolled_back = CoreEvent::Preference(PreferenceEvent::RolledBack {
            song_id: "a".into(),
            is_liked: false,
            is_disliked: false,
            message: "offline".into(),
        });
        let fallback = CoreEvent::Library(LibraryEvent::CatalogLoaded {
            song_count: 12,
            from_fallback: true,
        });
        let error = CoreEvent::Playback(PlaybackEvent::Error {
            song_id: None,
            message: "no audio url".into(),
            recoverable: true,
        });

        assert_eq!(rolled_back.severity(), EventSeverity::Warning);
        assert_eq!(fallback.severity(), EventSeverity::Warning);
        assert_eq!(error.severity(), EventSeverity::Error);
        assert_eq!(toggled("a").severity(), EventSeverity::Debug);
        assert_eq!(fallback.description(), "Catalog loaded from bundled defaults");
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = CoreEvent::Playback(PlaybackEvent::Completed {
            song_id: "sample-3".into(),
        });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "Playback");
        assert_eq!(json["payload"]["event"], "Completed");
        assert_eq!(json["payload"]["song_id"], "sample-3");

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_preference_event_helpers() {
        let event = PreferenceEvent::StatusRefreshed {
            song_id: "x".into(),
            is_liked: false,
            is_disliked: true,
        };
        assert_eq!(event.song_id(), "x");
        assert!(event.is_settled());
        assert!(!matches!(toggled("x"), CoreEvent::Preference(ref e) if e.is_settled()));
    }
}
