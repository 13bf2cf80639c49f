use std::sync::Arc;

use futures::{future, Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::audio::PlaybackEvent;
use crate::engine::events::HandlerId;

use super::PlaybackEngine;

impl PlaybackEngine {
    // ========================================================================
    // POSITION HANDLERS
    // ========================================================================

    /// Register a callback receiving the playback position in seconds.
    ///
    /// Handlers run on the playback thread, once per drained position event,
    /// and with `0.0` when a session ends. They should return quickly.
    pub fn add_position_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.hub.add_handler(Arc::new(handler))
    }

    /// Unregister a handler; returns whether it was registered.
    pub fn remove_position_handler(&self, id: HandlerId) -> bool {
        self.hub.remove_handler(id)
    }

    // ========================================================================
    // EVENT SUBSCRIPTIONS
    // ========================================================================

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.hub.subscribe()
    }

    /// Async stream of playback events. Lagged receivers skip missed events.
    pub fn event_stream(&self) -> impl Stream<Item = PlaybackEvent> + Unpin {
        BroadcastStream::new(self.subscribe()).filter_map(|event| future::ready(event.ok()))
    }
}
