//! PlaybackEngine: transport control over a pluggable output backend.
//!
//! The engine owns one loaded [`AudioBuffer`] and at most one playback
//! session. Each `play()` spawns a dedicated playback thread that opens the
//! stream, reports the open result back synchronously, then polls the event
//! ring every `position_poll_interval_ms` to dispatch position handlers and
//! broadcast events until the session ends. Control calls only touch atomics
//! in [`TransportState`], so they never block on the audio thread.
//!
//! `play()` and `stop()` from ordinary threads are serialised by a control
//! lock and join the previous playback thread outside the session slot. A
//! position handler may call either one from the playback thread: `stop()`
//! only flags the transport there, and `play()` is dropped if another thread
//! is mid-way through a control call.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::{Consumer, RingBuffer};
use serde::{Deserialize, Serialize};

use crate::audio::{
    AudioBuffer, CallbackFlow, PlaybackCallback, PlaybackEvent, SessionSignals, TransportState,
};
use crate::config::PlaybackConfig;
use crate::engine::backend::{CpalBackend, OutputBackend, StreamHooks, StreamRequest};
use crate::engine::events::EventHub;
use crate::error::{log_audio_error, AudioError};

#[path = "core_subscriptions.rs"]
mod core_subscriptions;

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Engine whose playback thread this is, if any.
    static PLAYBACK_OWNER: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Coarse transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Snapshot of the engine returned by [`PlaybackEngine::status`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub looping: bool,
    pub volume: f32,
    pub device: Option<String>,
}

/// Playback engine over an [`OutputBackend`]
pub struct PlaybackEngine {
    id: u64,
    backend: Arc<dyn OutputBackend>,
    config: PlaybackConfig,
    transport: Arc<TransportState>,
    hub: Arc<EventHub>,
    buffer: Mutex<Option<AudioBuffer>>,
    device: Mutex<Option<String>>,
    control: Mutex<()>,
    session: Mutex<Option<Session>>,
}

struct Session {
    handle: JoinHandle<()>,
    signals: Arc<SessionSignals>,
}

impl PlaybackEngine {
    pub fn new(backend: Arc<dyn OutputBackend>, config: PlaybackConfig) -> Self {
        let transport = Arc::new(TransportState::new(config.volume));
        let hub = Arc::new(EventHub::new(config.broadcast_capacity));
        let device = config.device.clone();
        Self {
            id: NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed),
            backend,
            config,
            transport,
            hub,
            buffer: Mutex::new(None),
            device: Mutex::new(device),
            control: Mutex::new(()),
            session: Mutex::new(None),
        }
    }

    /// Engine on the platform's default cpal host.
    pub fn with_default_backend(config: PlaybackConfig) -> Self {
        Self::new(Arc::new(CpalBackend::new()), config)
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    // ========================================================================
    // BUFFER
    // ========================================================================

    /// Replace the loaded buffer, stopping any running session first.
    pub fn load_buffer(&self, buffer: AudioBuffer) -> Result<(), AudioError> {
        self.stop()?;
        log::info!(
            "[PlaybackEngine] Loaded buffer: {} frames, {} ch @ {} Hz",
            buffer.frames(),
            buffer.channels(),
            buffer.sample_rate()
        );
        *lock(&self.buffer, "buffer")? = Some(buffer);
        Ok(())
    }

    pub fn buffer(&self) -> Option<AudioBuffer> {
        self.buffer.lock().ok().and_then(|b| b.clone())
    }

    // ========================================================================
    // TRANSPORT
    // ========================================================================

    /// Start playback of `start..end` seconds (`end = None` plays to the end).
    ///
    /// Does nothing if already playing. Returns once the stream is open, or
    /// with the backend's error if it could not be opened.
    pub fn play(&self, start: f64, end: Option<f64>) -> Result<(), AudioError> {
        let Some(_control) = self.acquire_control()? else {
            log::debug!("[PlaybackEngine] play() from handler ignored: control call in progress");
            return Ok(());
        };

        if self.transport.is_playing() {
            // A session that reached its end is still tearing down; wait for it.
            let ending = lock(&self.session, "session")?
                .as_ref()
                .map(|s| s.signals.is_finished())
                .unwrap_or(false);
            if !ending {
                log::debug!("[PlaybackEngine] play() ignored: already playing");
                return Ok(());
            }
        }

        let buffer = lock(&self.buffer, "buffer")?
            .clone()
            .ok_or(AudioError::NoBuffer)?;
        let (start_frame, end_frame) = resolve_range(&buffer, start, end)?;

        let previous = lock(&self.session, "session")?.take();
        if let Some(previous) = previous {
            if previous.handle.thread().id() == thread::current().id() {
                // Restarted from our own handler; this thread exits once it returns.
                log::debug!("[PlaybackEngine] detaching current playback thread");
            } else {
                join_session(previous.handle);
            }
        }

        let generation = self.transport.begin(start_frame as u64, end_frame as u64);
        let signals = Arc::new(SessionSignals::default());
        let (producer, consumer) = RingBuffer::new(self.config.event_ring_capacity.max(1));
        let request = StreamRequest {
            device: lock(&self.device, "device")?.clone(),
            channels: buffer.channels(),
            sample_rate: buffer.sample_rate(),
            chunk_size: self.config.chunk_size,
        };
        let callback = PlaybackCallback::new(
            buffer,
            Arc::clone(&self.transport),
            Arc::clone(&signals),
            producer,
            generation,
        );

        let (ready_tx, ready_rx) = sync_channel(1);
        let ctx = SessionContext {
            engine_id: self.id,
            backend: Arc::clone(&self.backend),
            transport: Arc::clone(&self.transport),
            hub: Arc::clone(&self.hub),
            signals: Arc::clone(&signals),
            request,
            generation,
            poll_interval: Duration::from_millis(self.config.position_poll_interval_ms.max(1)),
        };

        let handle = thread::Builder::new()
            .name("spiny-playback".to_string())
            .spawn(move || run_session(ctx, callback, consumer, ready_tx))
            .map_err(|e| {
                self.transport.finish(generation);
                AudioError::ThreadSpawnFailed {
                    reason: e.to_string(),
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                *lock(&self.session, "session")? = Some(Session { handle, signals });
                log::info!(
                    "[PlaybackEngine] Playing frames {}..{} (generation {})",
                    start_frame,
                    end_frame,
                    generation
                );
                Ok(())
            }
            Ok(Err(err)) => {
                join_session(handle);
                log_audio_error(&err, "play");
                Err(err)
            }
            Err(_) => {
                join_session(handle);
                self.transport.finish(generation);
                Err(AudioError::StreamFailure {
                    reason: "playback thread exited before opening the stream".to_string(),
                })
            }
        }
    }

    /// Toggle pause while playing; no effect when stopped.
    pub fn pause_resume(&self) {
        if !self.transport.is_playing() {
            return;
        }
        let paused = self.transport.toggle_paused();
        log::debug!("[PlaybackEngine] paused = {}", paused);
    }

    /// Stop playback and wait for the playback thread to finish.
    ///
    /// No effect when not playing. Position returns to the range start and
    /// stays there; handlers are notified with that time on teardown. Called
    /// from a position handler it only flags the transport, and the playback
    /// thread exits once the handler returns.
    pub fn stop(&self) -> Result<(), AudioError> {
        if self.transport.is_playing() {
            self.transport.request_stop();
            log::debug!("[PlaybackEngine] stop requested");
        }
        if self.on_playback_thread() {
            return Ok(());
        }

        let _control = lock(&self.control, "control")?;
        let previous = lock(&self.session, "session")?.take();
        if let Some(previous) = previous {
            join_session(previous.handle);
        }
        Ok(())
    }

    pub fn set_looping(&self, enabled: bool) {
        self.transport.set_looping(enabled);
    }

    /// Flip looping; returns the new value.
    pub fn toggle_loop(&self) -> bool {
        self.transport.toggle_looping()
    }

    /// Set output gain, clamped to `[0, 1]`. Non-finite values are ignored.
    pub fn set_volume(&self, gain: f32) {
        if !gain.is_finite() {
            log::warn!("[PlaybackEngine] Ignoring non-finite volume {}", gain);
            return;
        }
        self.transport.set_volume(gain);
    }

    /// Select the output device for subsequent `play()` calls.
    pub fn set_device(&self, device: Option<String>) -> Result<(), AudioError> {
        *lock(&self.device, "device")? = device;
        Ok(())
    }

    pub fn device(&self) -> Option<String> {
        self.device.lock().ok().and_then(|d| d.clone())
    }

    pub fn devices(&self) -> Result<Vec<crate::engine::backend::OutputDevice>, AudioError> {
        self.backend.devices()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    fn on_playback_thread(&self) -> bool {
        PLAYBACK_OWNER.with(|owner| owner.get() == Some(self.id))
    }

    /// Take the control lock. On our own playback thread this never waits,
    /// since the holder may be joining that very thread.
    fn acquire_control(&self) -> Result<Option<MutexGuard<'_, ()>>, AudioError> {
        if !self.on_playback_thread() {
            return lock(&self.control, "control").map(Some);
        }
        match self.control.try_lock() {
            Ok(guard) => Ok(Some(guard)),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Poisoned(_)) => Err(AudioError::LockPoisoned {
                component: "control".to_string(),
            }),
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        let buffer = self.buffer();
        let state = match (self.transport.is_playing(), self.transport.is_paused()) {
            (false, _) => PlaybackState::Idle,
            (true, false) => PlaybackState::Playing,
            (true, true) => PlaybackState::Paused,
        };
        let position_secs = buffer
            .as_ref()
            .map(|b| b.frame_to_seconds(self.transport.position() as usize))
            .unwrap_or(0.0);

        PlaybackStatus {
            state,
            position_secs,
            duration_secs: buffer.as_ref().map(AudioBuffer::duration_secs),
            looping: self.transport.is_looping(),
            volume: self.transport.volume(),
            device: self.device(),
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::warn!("[PlaybackEngine] stop during drop failed: {}", err);
        }
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, component: &str) -> Result<MutexGuard<'a, T>, AudioError> {
    mutex.lock().map_err(|_| AudioError::LockPoisoned {
        component: component.to_string(),
    })
}

fn join_session(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        log::error!("[PlaybackEngine] playback thread panicked");
    }
}

/// Convert a seconds range into frame bounds, rejecting empty or reversed
/// ranges.
fn resolve_range(
    buffer: &AudioBuffer,
    start: f64,
    end: Option<f64>,
) -> Result<(usize, usize), AudioError> {
    let end_secs = end.unwrap_or_else(|| buffer.duration_secs());
    let invalid = AudioError::InvalidRange {
        start,
        end: end_secs,
    };
    if !start.is_finite() || !end_secs.is_finite() || start < 0.0 {
        return Err(invalid);
    }

    let start_frame = buffer.seconds_to_frame(start);
    let end_frame = match end {
        Some(end) => buffer.seconds_to_frame(end),
        None => buffer.frames(),
    };
    if start_frame >= end_frame {
        return Err(invalid);
    }
    Ok((start_frame, end_frame))
}

struct SessionContext {
    engine_id: u64,
    backend: Arc<dyn OutputBackend>,
    transport: Arc<TransportState>,
    hub: Arc<EventHub>,
    signals: Arc<SessionSignals>,
    request: StreamRequest,
    generation: u64,
    poll_interval: Duration,
}

/// Body of the playback thread: open, poll, tear down.
fn run_session(
    ctx: SessionContext,
    mut callback: PlaybackCallback,
    mut events: Consumer<PlaybackEvent>,
    ready: SyncSender<Result<(), AudioError>>,
) {
    let span = tracing::info_span!("playback", generation = ctx.generation);
    let _enter = span.enter();
    PLAYBACK_OWNER.with(|owner| owner.set(Some(ctx.engine_id)));

    let render_signals = Arc::clone(&ctx.signals);
    let fault_signals = Arc::clone(&ctx.signals);
    let hooks = StreamHooks {
        render: Box::new(move |out: &mut [f32]| {
            match catch_unwind(AssertUnwindSafe(|| callback.render(out))) {
                Ok(flow) => flow,
                Err(_) => {
                    out.fill(0.0);
                    render_signals.record_fault("render callback panicked".to_string());
                    CallbackFlow::Stop
                }
            }
        }),
        fault: Box::new(move |fault| {
            if fault.fatal {
                fault_signals.record_fault(fault.message);
            } else {
                fault_signals.record_underrun(fault.message);
            }
        }),
    };

    let stream = match ctx.backend.open(&ctx.request, hooks) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(error = %err, "failed to open output stream");
            ctx.transport.finish(ctx.generation);
            let _ = ready.send(Err(err));
            return;
        }
    };
    let _ = ready.send(Ok(()));
    tracing::info!(device = stream.device_name(), "output stream started");
    ctx.hub.publish(PlaybackEvent::Started {
        generation: ctx.generation,
    });

    let mut reported_underruns = 0;
    loop {
        ctx.hub.drain(&mut events);

        let underruns = ctx.signals.underruns();
        if underruns > reported_underruns {
            reported_underruns = underruns;
            let detail = ctx.signals.last_underrun().unwrap_or_default();
            tracing::warn!(count = underruns, %detail, "output underrun");
            ctx.hub.publish(PlaybackEvent::Underrun {
                count: underruns,
                detail,
            });
        }

        if let Some(message) = ctx.signals.take_fault() {
            tracing::error!(%message, "output stream failed");
            ctx.hub.publish(PlaybackEvent::Error { message });
            break;
        }

        if ctx.signals.is_finished()
            || !ctx.transport.is_playing()
            || ctx.transport.generation() != ctx.generation
        {
            break;
        }

        thread::sleep(ctx.poll_interval);
    }

    drop(stream);

    if let Some(resting) = ctx.transport.finish(ctx.generation) {
        ctx.hub.drain(&mut events);
        ctx.hub
            .notify_position(resting as f64 / f64::from(ctx.request.sample_rate));
        ctx.hub.publish(PlaybackEvent::Finished {
            generation: ctx.generation,
        });
        tracing::info!("playback finished");
    } else {
        tracing::debug!("session superseded; skipping reset");
    }
}
