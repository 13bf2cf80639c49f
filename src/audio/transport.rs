//! Transport state shared between the control thread and the audio thread
//!
//! Every field is a plain atomic so the audio callback never takes a lock.
//! The control thread writes flags (`playing`, `paused`, `looping`, `volume`)
//! and the callback writes `position` back. A stale read costs at most one
//! callback period of audio or position.
//!
//! `generation` is bumped on every `play()`. A callback only acts on the
//! transport while its captured generation is current, which keeps a stream
//! that is still closing from writing into the next session.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Events produced by a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Stream opened and running
    Started { generation: u64 },
    /// Current playback position in seconds
    Position { seconds: f64 },
    /// Device reported a non-fatal problem; playback continues
    Underrun { count: u64, detail: String },
    /// Session ended after an unrecoverable stream error
    Error { message: String },
    /// Stream closed (end reached, stopped, or failed)
    Finished { generation: u64 },
}

/// Lock-free transport flags and position
#[derive(Debug)]
pub struct TransportState {
    playing: AtomicBool,
    paused: AtomicBool,
    looping: AtomicBool,
    /// Current frame index
    position: AtomicU64,
    /// First frame of the active range
    start: AtomicU64,
    /// One past the last frame of the active range
    end: AtomicU64,
    /// Gain as f32 bits
    volume: AtomicU32,
    generation: AtomicU64,
}

impl TransportState {
    pub fn new(volume: f32) -> Self {
        Self {
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            looping: AtomicBool::new(false),
            position: AtomicU64::new(0),
            start: AtomicU64::new(0),
            end: AtomicU64::new(0),
            volume: AtomicU32::new(clamp_gain(volume).to_bits()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }

    pub fn set_looping(&self, enabled: bool) {
        self.looping.store(enabled, Ordering::Relaxed);
    }

    /// Flip looping; returns the new value.
    pub fn toggle_looping(&self) -> bool {
        !self.looping.fetch_xor(true, Ordering::Relaxed)
    }

    /// Flip paused; returns the new value.
    pub fn toggle_paused(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Acquire)
    }

    /// Move the position only if nobody else moved it since `current` was read.
    pub fn advance_position(&self, current: u64, next: u64) -> bool {
        self.position
            .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn bounds(&self) -> (u64, u64) {
        (
            self.start.load(Ordering::Acquire),
            self.end.load(Ordering::Acquire),
        )
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    pub fn set_volume(&self, gain: f32) {
        self.volume
            .store(clamp_gain(gain).to_bits(), Ordering::Relaxed);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Arm a new session over frames `start..end`; returns its generation.
    pub fn begin(&self, start: u64, end: u64) -> u64 {
        self.start.store(start, Ordering::Release);
        self.end.store(end, Ordering::Release);
        self.position.store(start, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.playing.store(true, Ordering::Release);
        generation
    }

    /// Request a stop: the next callback observes it and ends the stream.
    /// Position goes back to the start of the range.
    pub fn request_stop(&self) {
        self.playing.store(false, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        let (start, _) = self.bounds();
        self.position.store(start, Ordering::Release);
    }

    /// Tear-down after a session ends. Only applies when `generation` is still
    /// current; returns the resting position if it did.
    ///
    /// A session that was stopped keeps the range start set by
    /// [`request_stop`](Self::request_stop). One that ended on its own (end of
    /// range or device failure) rewinds to frame 0.
    pub fn finish(&self, generation: u64) -> Option<u64> {
        if self.generation() != generation {
            return None;
        }
        let was_playing = self.playing.swap(false, Ordering::AcqRel);
        self.paused.store(false, Ordering::Release);
        if was_playing {
            self.position.store(0, Ordering::Release);
        }
        Some(self.position())
    }
}

fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        1.0
    } else {
        gain.clamp(0.0, 1.0)
    }
}

/// Per-session signals raised from the audio side
///
/// `finished` is set by the render callback when it asks the stream to stop.
/// Device errors arrive on the host's error callback: non-fatal ones bump
/// `underruns`, fatal ones park a message in `fault`.
#[derive(Debug, Default)]
pub struct SessionSignals {
    finished: AtomicBool,
    underruns: AtomicU64,
    last_underrun: Mutex<Option<String>>,
    fault: Mutex<Option<String>>,
}

impl SessionSignals {
    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn record_underrun(&self, detail: String) {
        if let Ok(mut last) = self.last_underrun.lock() {
            *last = Some(detail);
        }
        self.underruns.fetch_add(1, Ordering::AcqRel);
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Acquire)
    }

    pub fn last_underrun(&self) -> Option<String> {
        self.last_underrun.lock().ok().and_then(|last| last.clone())
    }

    pub fn record_fault(&self, message: String) {
        if let Ok(mut fault) = self.fault.lock() {
            fault.get_or_insert(message);
        }
    }

    pub fn take_fault(&self) -> Option<String> {
        self.fault.lock().ok().and_then(|mut fault| fault.take())
    }
}
