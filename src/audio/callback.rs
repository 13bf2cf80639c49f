//! Playback render callback - fills device buffers from an [`AudioBuffer`]
//!
//! `PlaybackCallback` owns everything the audio I/O thread touches while a
//! stream is open. It reads transport flags from [`TransportState`], copies
//! samples out of the shared buffer and reports the new position through a
//! lock-free SPSC ring (`rtrb`). User handlers never run here; the playback
//! thread drains the ring and dispatches them.
//!
//! # Real-Time Safety
//! - No heap allocations while rendering
//! - No locks (atomics and the ring buffer only)
//! - Bounded work per call: one copy of at most `out.len()` samples
//!
//! # Architecture
//! ```text
//! PlaybackEngine::play()
//!   └─> playback thread
//!       └─> OutputBackend::open(request, hooks)
//!           └─> PlaybackCallback::render() [audio I/O thread]
//!               ├─> TransportState (atomics)
//!               └─> rtrb::Producer<PlaybackEvent>
//! ```

use std::sync::Arc;

use rtrb::Producer;

use super::buffer::AudioBuffer;
use super::transport::{PlaybackEvent, SessionSignals, TransportState};

/// What the stream should do after a render call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackFlow {
    Continue,
    Stop,
}

pub struct PlaybackCallback {
    buffer: AudioBuffer,
    transport: Arc<TransportState>,
    signals: Arc<SessionSignals>,
    events: Producer<PlaybackEvent>,
    generation: u64,
}

impl PlaybackCallback {
    pub fn new(
        buffer: AudioBuffer,
        transport: Arc<TransportState>,
        signals: Arc<SessionSignals>,
        events: Producer<PlaybackEvent>,
        generation: u64,
    ) -> Self {
        Self {
            buffer,
            transport,
            signals,
            events,
            generation,
        }
    }

    /// Fill `out` with interleaved samples.
    ///
    /// Paused streams output silence and keep their position, still reporting
    /// it once per call. A stopped or
    /// superseded session outputs silence and returns [`CallbackFlow::Stop`].
    /// When the end of the range is reached the remainder is zero-filled and
    /// the position wraps to the range start if looping, otherwise the stream
    /// stops.
    pub fn render(&mut self, out: &mut [f32]) -> CallbackFlow {
        if self.transport.generation() != self.generation || !self.transport.is_playing() {
            out.fill(0.0);
            return self.stop();
        }
        if self.transport.is_paused() {
            out.fill(0.0);
            let seconds = self.buffer.frame_to_seconds(self.transport.position() as usize);
            let _ = self.events.push(PlaybackEvent::Position { seconds });
            return CallbackFlow::Continue;
        }

        let channels = self.buffer.channels() as usize;
        let requested = out.len() / channels;
        let (start, end) = self.transport.bounds();
        let position = self.transport.position();
        let current = position.clamp(start, end);

        let available = (end - current) as usize;
        let frames = available.min(requested);
        let from = current as usize;
        let gain = self.transport.volume();
        let source = self.buffer.frame_slice(from, from + frames);
        for (dst, &src) in out.iter_mut().zip(source) {
            *dst = src * gain;
        }
        out[frames * channels..].fill(0.0);

        let mut next = current + frames as u64;
        let mut flow = CallbackFlow::Continue;
        if next >= end {
            if self.transport.is_looping() {
                next = start;
            } else {
                flow = CallbackFlow::Stop;
            }
        }

        // A concurrent stop() rewinds the position; keep its value.
        if self.transport.advance_position(position, next) {
            let seconds = self.buffer.frame_to_seconds(next as usize);
            let _ = self.events.push(PlaybackEvent::Position { seconds });
        }

        if flow == CallbackFlow::Stop {
            self.stop()
        } else {
            flow
        }
    }

    fn stop(&self) -> CallbackFlow {
        self.signals.mark_finished();
        CallbackFlow::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtrb::{Consumer, RingBuffer};

    const RATE: u32 = 1000;

    struct Harness {
        callback: PlaybackCallback,
        transport: Arc<TransportState>,
        signals: Arc<SessionSignals>,
        events: Consumer<PlaybackEvent>,
    }

    fn harness(samples: Vec<f32>, start: u64, end: u64) -> Harness {
        let buffer = AudioBuffer::mono(samples, RATE).unwrap();
        let transport = Arc::new(TransportState::new(1.0));
        let generation = transport.begin(start, end);
        let signals = Arc::new(SessionSignals::default());
        let (producer, consumer) = RingBuffer::new(64);
        let callback = PlaybackCallback::new(
            buffer,
            Arc::clone(&transport),
            Arc::clone(&signals),
            producer,
            generation,
        );
        Harness {
            callback,
            transport,
            signals,
            events: consumer,
        }
    }

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32 / len as f32).collect()
    }

    fn last_position(events: &mut Consumer<PlaybackEvent>) -> Option<f64> {
        let mut last = None;
        while let Ok(event) = events.pop() {
            if let PlaybackEvent::Position { seconds } = event {
                last = Some(seconds);
            }
        }
        last
    }

    #[test]
    fn test_copies_samples_and_advances() {
        let mut h = harness(ramp(1000), 0, 1000);
        let mut out = vec![0.0; 100];
        assert_eq!(h.callback.render(&mut out), CallbackFlow::Continue);
        assert_eq!(out[10], 10.0 / 1000.0);
        assert_eq!(h.transport.position(), 100);
        assert_eq!(last_position(&mut h.events), Some(0.1));
    }

    #[test]
    fn test_loop_wraps_to_start() {
        let mut h = harness(vec![0.5; 1000], 0, 1000);
        h.transport.set_looping(true);
        let mut out = vec![0.0; 100];

        let mut wrapped = false;
        let mut previous = 0;
        for _ in 0..15 {
            assert_eq!(h.callback.render(&mut out), CallbackFlow::Continue);
            let position = h.transport.position();
            if position < previous {
                wrapped = true;
            }
            previous = position;
        }

        assert!(wrapped);
        let seconds = last_position(&mut h.events).unwrap();
        assert!(seconds < 1.0, "position should have wrapped, got {seconds}");
        assert!(!h.signals.is_finished());
    }

    #[test]
    fn test_short_read_zero_fills_and_stops() {
        let mut h = harness(vec![1.0; 150], 0, 150);
        let mut out = vec![9.0; 100];
        assert_eq!(h.callback.render(&mut out), CallbackFlow::Continue);
        assert_eq!(h.callback.render(&mut out), CallbackFlow::Stop);
        assert!(out[..50].iter().all(|&s| s == 1.0));
        assert!(out[50..].iter().all(|&s| s == 0.0));
        assert!(h.signals.is_finished());
    }

    #[test]
    fn test_pause_preserves_position() {
        let mut h = harness(vec![1.0; 1000], 0, 1000);
        let mut out = vec![0.0; 100];
        h.callback.render(&mut out);
        assert_eq!(h.transport.position(), 100);

        h.transport.toggle_paused();
        for _ in 0..5 {
            assert_eq!(h.callback.render(&mut out), CallbackFlow::Continue);
            assert!(out.iter().all(|&s| s == 0.0));
        }
        assert_eq!(h.transport.position(), 100);

        h.transport.toggle_paused();
        h.callback.render(&mut out);
        assert_eq!(h.transport.position(), 200);
    }

    #[test]
    fn test_paused_callback_still_reports_position() {
        let mut h = harness(vec![1.0; 1000], 0, 1000);
        let mut out = vec![0.0; 100];
        h.callback.render(&mut out);
        assert_eq!(last_position(&mut h.events), Some(0.1));

        h.transport.toggle_paused();
        for _ in 0..3 {
            h.callback.render(&mut out);
        }
        let mut reported = Vec::new();
        while let Ok(event) = h.events.pop() {
            reported.push(event);
        }
        assert_eq!(reported, vec![PlaybackEvent::Position { seconds: 0.1 }; 3]);
    }

    #[test]
    fn test_volume_scales_output() {
        let mut h = harness(vec![0.8; 1000], 0, 1000);
        h.transport.set_volume(0.5);
        let mut out = vec![0.0; 10];
        h.callback.render(&mut out);
        assert!(out.iter().all(|&s| (s - 0.4).abs() < 1e-6));
    }

    #[test]
    fn test_range_start_offset() {
        let mut h = harness(ramp(1000), 500, 600);
        let mut out = vec![0.0; 10];
        h.callback.render(&mut out);
        assert_eq!(out[0], 0.5);
        assert_eq!(h.transport.position(), 510);
    }

    #[test]
    fn test_stopped_transport_outputs_silence() {
        let mut h = harness(vec![1.0; 1000], 0, 1000);
        h.transport.request_stop();
        let mut out = vec![1.0; 10];
        assert_eq!(h.callback.render(&mut out), CallbackFlow::Stop);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(h.signals.is_finished());
    }

    #[test]
    fn test_superseded_generation_stops() {
        let mut h = harness(vec![1.0; 1000], 0, 1000);
        h.transport.begin(0, 1000);
        let mut out = vec![1.0; 10];
        assert_eq!(h.callback.render(&mut out), CallbackFlow::Stop);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(h.transport.position(), 0);
    }

    #[test]
    fn test_stereo_frames() {
        let samples = vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0];
        let buffer = AudioBuffer::new(samples, 2, RATE).unwrap();
        let transport = Arc::new(TransportState::new(1.0));
        let generation = transport.begin(0, 3);
        let (producer, _consumer) = RingBuffer::new(8);
        let mut callback = PlaybackCallback::new(
            buffer,
            Arc::clone(&transport),
            Arc::new(SessionSignals::default()),
            producer,
            generation,
        );
        let mut out = vec![0.0; 4];
        callback.render(&mut out);
        assert_eq!(out, vec![1.0, -1.0, 2.0, -2.0]);
        assert_eq!(transport.position(), 2);
    }
}
