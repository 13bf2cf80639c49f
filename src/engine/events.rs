// EventHub: fan-out of playback events to position handlers and subscribers
//
// Events reach the hub only from the playback thread, never from the audio
// I/O thread. Position handlers are plain callbacks; everything else goes to
// a tokio broadcast channel so async consumers can follow along.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rtrb::Consumer;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::audio::PlaybackEvent;

/// Identifies a registered position handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerId(u64);

type PositionHandler = Arc<dyn Fn(f64) + Send + Sync + 'static>;

pub(crate) struct EventHub {
    handlers: Mutex<Vec<(HandlerId, PositionHandler)>>,
    next_id: AtomicU64,
    tx: broadcast::Sender<PlaybackEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            handlers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            tx,
        }
    }

    pub fn add_handler(&self, handler: PositionHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match self.handlers.lock() {
            Ok(mut handlers) => handlers.push((id, handler)),
            Err(poisoned) => poisoned.into_inner().push((id, handler)),
        }
        id
    }

    /// Returns whether a handler with `id` was registered.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = match self.handlers.lock() {
            Ok(handlers) => handlers,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        handlers.len() != before
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.tx.subscribe()
    }

    /// Call every position handler with `seconds`.
    ///
    /// The list is snapshotted first so handlers may add or remove handlers.
    /// A panicking handler is logged and skipped.
    pub fn notify_position(&self, seconds: f64) {
        let snapshot: Vec<(HandlerId, PositionHandler)> = match self.handlers.lock() {
            Ok(handlers) => handlers.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for (id, handler) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(seconds))).is_err() {
                tracing::warn!(?id, "position handler panicked");
            }
        }
    }

    pub fn publish(&self, event: PlaybackEvent) {
        if let PlaybackEvent::Position { seconds } = event {
            self.notify_position(seconds);
        }
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    /// Dispatch everything queued by the render callback; returns the count.
    pub fn drain(&self, events: &mut Consumer<PlaybackEvent>) -> usize {
        let mut count = 0;
        while let Ok(event) = events.pop() {
            self.publish(event);
            count += 1;
        }
        count
    }
}
