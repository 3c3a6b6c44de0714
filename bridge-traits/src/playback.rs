//! Playback engine bridge.
//!
//! The host owns audio decoding and output. The core drives it through the
//! synchronous [`PlaybackEngine`] contract and observes it through
//! [`EngineEvent`]s delivered over an unbounded channel, so every callback is
//! handled on the session's own task.

use tokio::sync::mpsc;

use crate::error::Result;

/// Notification raised by a [`PlaybackEngine`] about the currently loaded item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    /// Playback position in seconds.
    TimeUpdated(f64),
    /// Item duration in seconds, once known.
    DurationUpdated(f64),
    /// The loaded item played to its end.
    Finished,
    /// Whether audio is currently rendering.
    PlaybackStateChanged(bool),
}

/// Sending half handed to engines at construction time.
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiving half consumed by the session runner.
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Create the event channel connecting an engine to the session runner.
pub fn engine_event_channel() -> (EngineEventSender, EngineEventReceiver) {
    mpsc::unbounded_channel()
}

/// Platform audio engine.
///
/// Implementations must stop emitting events for an item once [`stop`] or a
/// subsequent [`load`] has torn it down.
///
/// [`stop`]: PlaybackEngine::stop
/// [`load`]: PlaybackEngine::load
pub trait PlaybackEngine: Send + Sync {
    /// Attach a new item for the given URL. Previous resources must already be
    /// released or are released here.
    fn load(&self, url: &str) -> Result<()>;

    /// Begin or resume rendering.
    fn play(&self);

    /// Pause without releasing the item.
    fn pause(&self);

    /// Seek to an absolute position in seconds.
    fn seek(&self, seconds: f64);

    /// Stop and release the current item and its observers.
    fn stop(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn engine_events_arrive_in_order() {
        let (tx, mut rx) = engine_event_channel();
        tx.send(EngineEvent::DurationUpdated(200.0)).unwrap();
        tx.send(EngineEvent::TimeUpdated(1.0)).unwrap();
        tx.send(EngineEvent::Finished).unwrap();

        assert_eq!(rx.recv().await, Some(EngineEvent::DurationUpdated(200.0)));
        assert_eq!(rx.recv().await, Some(EngineEvent::TimeUpdated(1.0)));
        assert_eq!(rx.recv().await, Some(EngineEvent::Finished));
    }
}
